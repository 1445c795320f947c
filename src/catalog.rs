//! Static product catalog and the storefront home page.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;
use tracing::instrument;

use crate::{
    accounts::{extractors::OptionalUser, repo_types::SessionUser},
    session::{take_flashes, Flash},
};

#[derive(Debug, Clone)]
pub struct Product {
    pub id: u32,
    pub name: &'static str,
    pub price_cents: u32,
    pub description: &'static str,
    pub image: &'static str,
}

impl Product {
    pub fn price_display(&self) -> String {
        format!("${}.{:02}", self.price_cents / 100, self.price_cents % 100)
    }
}

pub const PRODUCTS: [Product; 4] = [
    Product {
        id: 1,
        name: "Wireless Headphones",
        price_cents: 9999,
        description: "High-quality wireless headphones with noise cancellation",
        image: "https://images.unsplash.com/photo-1505740420928-5e560c06d30e?w=300&h=300&fit=crop",
    },
    Product {
        id: 2,
        name: "Smart Watch",
        price_cents: 19999,
        description: "Feature-rich smartwatch with health monitoring",
        image: "https://images.unsplash.com/photo-1523275335684-37898b6baf30?w=300&h=300&fit=crop",
    },
    Product {
        id: 3,
        name: "Laptop",
        price_cents: 89999,
        description: "Powerful laptop for work and gaming",
        image: "https://images.unsplash.com/photo-1496181133206-80ce9b88a853?w=300&h=300&fit=crop",
    },
    Product {
        id: 4,
        name: "Smartphone",
        price_cents: 69999,
        description: "Latest smartphone with advanced camera system",
        image: "https://images.unsplash.com/photo-1511707171634-5f897ff02aa9?w=300&h=300&fit=crop",
    },
];

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub current_user: Option<SessionUser>,
    pub flashes: Vec<Flash>,
    pub products: Vec<Product>,
}

#[instrument(skip_all)]
pub async fn home(session: Session, OptionalUser(current_user): OptionalUser) -> impl IntoResponse {
    HomeTemplate {
        current_user,
        flashes: take_flashes(&session).await,
        products: PRODUCTS.to_vec(),
    }
}
