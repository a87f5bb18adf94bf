use std::{collections::HashMap, env, sync::mpsc};

use color_eyre::{eyre::eyre, Result};
use gca_pads::{
    gca_adapter::AXIS_COUNT, ButtonMask, Config, GcaAdapter, Pad, PadEvent, PadList, SlotTable,
    Transport, UsbTransport,
};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

const DEFAULT_CONFIG_PATH: &str = "gca.yml";

/// Last values reported for a slot, used to log only changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct PadSnapshot {
    buttons: ButtonMask,
    axes: [i16; AXIS_COUNT],
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let loaded = Config::load(&path)?;
    let from_file = loaded.is_some();
    let config = loaded.unwrap_or_default();
    setup_logging(&config.log_level);
    if from_file {
        debug!("Loaded config from {}", path);
    } else {
        info!("No config at {}, using defaults", path);
    }

    let transport = UsbTransport::open(&config)
        .map_err(|e| eyre!("Unable to open {}: {}", config.adapter_name, e))?;
    let mut adapter = GcaAdapter::create(transport, PadList::new(config.pad_slots), &config)?;

    let (tx, rx) = mpsc::channel::<PadEvent>();
    adapter.set_pad_callback(move |event| {
        let _ = tx.send(event);
    });

    let mut snapshots: HashMap<usize, PadSnapshot> = HashMap::new();

    loop {
        match adapter.poll_once() {
            Ok(true) => {}
            Ok(false) => continue,
            Err(err) => {
                error!("Adapter read failed: {}", err);
                break;
            }
        }

        // Drain pad lifecycle events.
        while let Ok(event) = rx.try_recv() {
            match event {
                PadEvent::Connected { port, slot, name } => {
                    info!("{} ready in slot {} (port {})", name, slot, port + 1);
                    snapshots.insert(slot, PadSnapshot::default());
                }
                PadEvent::Disconnected { port, slot } => {
                    info!("Slot {} freed (port {})", slot, port + 1);
                    snapshots.remove(&slot);
                }
            }
        }

        report_changes(&adapter, &mut snapshots);
    }

    adapter.destroy();
    Ok(())
}

fn report_changes<T: Transport, S: SlotTable>(
    adapter: &GcaAdapter<T, S>,
    snapshots: &mut HashMap<usize, PadSnapshot>,
) {
    for pad in adapter.pads() {
        let current = PadSnapshot {
            buttons: pad.buttons(),
            axes: std::array::from_fn(|axis| pad.axis(axis)),
        };
        let previous = snapshots.entry(pad.slot()).or_default();
        if *previous == current {
            continue;
        }

        if previous.buttons != current.buttons {
            let pressed: Vec<_> = current.buttons.pressed().collect();
            debug!("{}: buttons {:?}", pad.name(), pressed);
        }
        if previous.axes != current.axes {
            debug!("{}: axes {:?}", pad.name(), current.axes);
        }
        *previous = current;
    }
}

fn setup_logging(level: &str) {
    let parsed = level.parse::<Level>().ok();
    FmtSubscriber::builder()
        .with_max_level(parsed.unwrap_or(Level::INFO))
        .with_target(false)
        .init();
    if parsed.is_none() {
        warn!("Unknown log level {:?}, using INFO", level);
    }
}
