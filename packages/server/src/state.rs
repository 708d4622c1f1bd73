use std::sync::Arc;

use carpecarb_lookup::{CompletionClient, LookupService};

pub struct AppState<C: CompletionClient> {
    pub service: Arc<LookupService<C>>,
}

impl<C: CompletionClient> AppState<C> {
    pub fn new(service: LookupService<C>) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

// Manual impl: a derive would demand `C: Clone`.
impl<C: CompletionClient> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
        }
    }
}
