// UI module
// TUI components and the interactive entry point

pub mod app_view;
pub mod diff_table;
pub mod styles;
pub mod terminal;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::info;

use crate::core::{spawn_input_task, Config, EventLoop};
use crate::operations::{DiffEngine, RsyncRepair, SyncCoordinator, TransportInventories};

pub use app_view::render_app;
pub use diff_table::render_diff_table;
pub use styles::Styles;

/// Run the interactive session until the user quits
pub async fn run_tui(config: Config) -> Result<()> {
    let inventories = Arc::new(TransportInventories::new(config.transport.shell.clone()));
    let repair = Arc::new(RsyncRepair::new(config.transport.clone()));
    let engine = DiffEngine::new(inventories.clone());
    let coordinator = SyncCoordinator::new(inventories, repair);
    let mut event_loop = EventLoop::new(config.directory_pairs, engine, coordinator);

    terminal::install_panic_hook();
    let mut tui = terminal::init().context("Failed to initialise terminal")?;
    spawn_input_task(event_loop.sender());
    info!(pairs = event_loop.session().pairs().len(), "interactive session started");

    let result = event_loop
        .run(|session| {
            tui.draw(|f| render_app(f, session))?;
            Ok(())
        })
        .await;

    terminal::restore()?;
    tui.show_cursor()?;
    info!("interactive session ended");
    result
}
