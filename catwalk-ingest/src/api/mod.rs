//! HTTP API handlers for catwalk-ingest

pub mod crawl;
pub mod health;
pub mod jobs;
pub mod review;
pub mod training;
pub mod wardrobe;

pub use crawl::crawl_routes;
pub use health::health_routes;
pub use jobs::job_routes;
pub use review::review_routes;
pub use training::training_routes;
pub use wardrobe::wardrobe_routes;
