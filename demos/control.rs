use std::path::PathBuf;
use std::sync::Arc;

use env_logger;
use tokio::io::{AsyncBufReadExt, BufReader};

use virgin_tivo::ManagerMessage::{
    LastChannel, NextChannel, Pause, Play, PreviousChannel, Search, SelectSource, ShutDown,
    TurnOff, TurnOn,
};
use virgin_tivo::{setup_platform, HttpGuideFetcher, ManagedTivo, PlatformConfig};

#[tokio::main]
async fn main() -> Result<(), ()> {
    // Print all logs to stdout
    // TODO: Set LevelFilter::Debug to see debug logging
    env_logger::Builder::new()
        .filter(None, log::LevelFilter::Info)
        .init();

    let config_path = PathBuf::from(std::env::args().nth(1).unwrap_or("tivo.toml".into()));

    let config = PlatformConfig::from_file(&config_path)
        .and_then(|config| config.validate())
        .map_err(|e| eprintln!("Could not load {}: {}", config_path.display(), e))?;

    let guide_fetcher =
        HttpGuideFetcher::new().map_err(|e| eprintln!("Could not create guide client: {e}"))?;

    let mut managed_tivos = setup_platform(&config, Arc::new(guide_fetcher)).await;

    if managed_tivos.is_empty() {
        eprintln!("No reachable TiVo boxes in {}", config_path.display());
        return Err(());
    }

    // Commands from the console go to the first box; every box is run and reports back
    let to_manager = managed_tivos[0].command_tx.clone();
    let mut to_managers = Vec::new();
    let mut manager_handles = Vec::new();

    for ManagedTivo {
        info,
        mut manager,
        command_tx,
        mut output_rx,
    } in managed_tivos.drain(..)
    {
        to_managers.push(command_tx);

        // Task to print all messages received from the manager
        tokio::spawn(async move {
            while let Some(manager_output_msg) = output_rx.recv().await {
                println!("<<< Received message from {}: {:?}", info.name, manager_output_msg);
            }
        });

        // Run the manager until instructed to shut down (ManagerMessage::ShutDown)
        manager_handles.push(tokio::spawn(async move { manager.run().await }));
    }

    println!(concat!(
        "\n>>> Enter command: on, off, play, pause, prev (+1), next, last, ",
        "ch <name>, search <text>, quit\n"
    ));

    let stdin = tokio::io::stdin();
    let mut reader = BufReader::new(stdin);

    loop {
        let mut buf = String::new();

        if reader.read_line(&mut buf).await.map_err(|_| ())? == 0 {
            break;
        }

        let message = match buf.trim().split_once(' ') {
            Some(("ch", name)) => SelectSource(name.trim().into()),
            Some(("search", text)) => Search(text.trim().into()),
            _ => match buf.trim() {
                "on" => TurnOn,
                "off" => TurnOff,
                "play" => Play,
                "pause" => Pause,
                "prev" => PreviousChannel,
                "next" => NextChannel,
                "last" => LastChannel,
                "quit" => break,
                _ => continue,
            },
        };

        to_manager.send(message).await.map_err(|_| ())?;
    }

    for to_manager in to_managers {
        to_manager.send(ShutDown).await.map_err(|_| ())?;
    }

    for handle in manager_handles {
        handle.await.map_err(|_| ())?;
    }

    Ok(())
}
