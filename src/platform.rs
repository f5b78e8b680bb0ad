//! Build managers for every configured TiVo box.

use std::sync::Arc;

use log::{info, warn};
use tokio::net::lookup_host;
use tokio::sync::mpsc::{channel, Receiver, Sender};

use crate::config::ValidatedConfig;
use crate::guide::{GuideCache, GuideFetcher};
use crate::{ManagerMessage, ManagerOutputMessage, TivoInfo, TivoManager, TivoManagerBuilder};

/// A manager for one box, along with the channels used to talk to it.
pub struct ManagedTivo {
    pub info: TivoInfo,
    pub manager: TivoManager,
    pub command_tx: Sender<ManagerMessage>,
    pub output_rx: Receiver<ManagerOutputMessage>,
}

/// Create a [`TivoManager`] for every configured box.
///
/// All managers share the channel directory and a single guide cache (when the guide is enabled).
/// Boxes whose host can't be resolved are left out. The managers are returned ready to
/// [`run()`](TivoManager::run).
pub async fn setup_platform(
    config: &ValidatedConfig,
    guide_fetcher: Arc<dyn GuideFetcher>,
) -> Vec<ManagedTivo> {
    let guide = config.guide.enable_guide.then(|| {
        Arc::new(GuideCache::new(
            Arc::clone(&config.channels),
            config.guide.clone(),
            guide_fetcher,
        ))
    });

    let mut managed_tivos = Vec::with_capacity(config.tivos.len());

    for device in &config.tivos {
        info!("Adding TiVo {} - {}", device.tivo_id, device.name);

        let is_resolvable = match lookup_host((device.host.as_str(), device.settings.port)).await {
            Ok(mut addrs) => addrs.next().is_some(),
            Err(_) => false,
        };

        if !is_resolvable {
            warn!(
                "Could not find TiVo {} - {} at [{}]",
                device.tivo_id, device.name, device.host
            );
            continue;
        }

        let (command_tx, command_rx) = channel(32);
        let mut builder = TivoManagerBuilder::new(device, Arc::clone(&config.channels), command_rx);

        if let Some(guide) = &guide {
            builder = builder.with_guide(Arc::clone(guide));
        }

        let (manager, output_rx) = builder.build();

        managed_tivos.push(ManagedTivo {
            info: manager.info().clone(),
            manager,
            command_tx,
            output_rx,
        });
    }

    managed_tivos
}

// ================================================================================================
// Tests
