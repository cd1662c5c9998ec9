use parley_core::config::AppConfig;
use parley_core::gateway::OperationGateway;
use parley_core::import::ModelCatalog;
use parley_core::layout::NativeThemeBridge;
use std::sync::Arc;

use crate::conversation::ConversationCoordinator;
use crate::import::ImportWorkflowController;
use crate::layout::LayoutController;
use crate::state::AppStores;

/// The store container wired to its coordinators.
///
/// All coordinators share one [`AppStores`], so a batch opened by one of
/// them also defers notifications of stores owned by the others.
pub struct ParleyApp {
    pub stores: Arc<AppStores>,
    pub conversations: ConversationCoordinator,
    pub import: ImportWorkflowController,
    pub layout: LayoutController,
}

impl ParleyApp {
    pub fn new(
        config: &AppConfig,
        gateway: Arc<dyn OperationGateway>,
        catalog: Arc<dyn ModelCatalog>,
        bridge: Arc<dyn NativeThemeBridge>,
    ) -> Self {
        let stores = Arc::new(AppStores::new(config));
        Self {
            conversations: ConversationCoordinator::new(stores.clone(), gateway.clone()),
            import: ImportWorkflowController::new(
                stores.clone(),
                gateway,
                catalog,
                config.import.clone(),
            ),
            layout: LayoutController::new(stores.clone(), bridge),
            stores,
        }
    }
}
