use anyhow::Result;

use rekindle_engine::device::DeviceConfig;
use rekindle_engine::logging::{init_logging, LoggingConfig};
use rekindle_engine::window::{Runtime, RuntimeConfig};

mod triangle;

use triangle::TriangleScene;

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let config = RuntimeConfig {
        title: "rekindle: triangle".to_string(),
        ..RuntimeConfig::default()
    };

    Runtime::run(config, DeviceConfig::default(), TriangleScene::default())
}
