
#[allow(unused)]
#[macro_use]
extern crate tracing;

use std::sync::Arc;

pub mod layers;
pub mod server;


/// Axum state wrapping the application behind an `Arc`; handlers deref straight to `T`
pub struct ServerState<T> {
    pub app: Arc<T>,
}
impl<T> Clone for ServerState<T> {
    fn clone(&self) -> Self {
        ServerState {
            app: Arc::clone(&self.app),
        }
    }
}
impl<T> std::ops::Deref for ServerState<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.app
    }
}
impl<T> ServerState<T> {
    pub fn new(app: Arc<T>) -> Self {
        Self { app }
    }
}

/// Common outer layers: panics become 500s, requests get a trace span
pub fn with_standard_layers(router: axum::Router) -> axum::Router {
    router
        .layer(tower_http::catch_panic::CatchPanicLayer::new())
        .layer(layers::make_trace_layer())
}
