//! Play every built-in sound on the default output device
//!
//! Run with: cargo run --example sfx_board
//!
//! Pass preset names to play only those, e.g. `cargo run --example sfx_board -- click nav-blip`.

use std::thread::sleep;
use std::time::Duration;

use blip::{EngineConfig, SoundName};
use tracing::{info, warn};

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    blip::configure(EngineConfig::default().with_master_volume(0.8));

    let requested: Vec<String> = std::env::args().skip(1).collect();
    let names: Vec<String> = if requested.is_empty() {
        SoundName::ALL.iter().map(|name| name.as_str().to_string()).collect()
    } else {
        requested
    };

    for name in &names {
        if name.parse::<SoundName>().is_err() {
            warn!(%name, "not a built-in sound, skipping");
            continue;
        }
        info!(%name, "playing");
        blip::play(name);
        sleep(Duration::from_millis(700));
    }

    // Rapid-fire clicks overlap without cutting each other off
    info!("five quick clicks");
    for _ in 0..5 {
        blip::play_click();
        sleep(Duration::from_millis(60));
    }

    blip::set_master_volume(0.3);
    info!("success at reduced volume");
    blip::play_success();

    // Let the last sound ring out before the process exits
    sleep(Duration::from_millis(600));
}
