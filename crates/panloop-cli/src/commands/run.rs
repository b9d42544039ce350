//! `panloop run` — the periodic PTZ control loop.
//!
//! Registers the standard task set against a configured transport: two
//! position-query tasks that emit Pelco-D frames, and a monitor task that
//! feeds whatever comes back through the stream parser. Without a
//! transport the frames are printed as hex (dry run), which keeps the
//! command useful on a desk with no hardware attached.

use std::io::{Read, Write};
use std::sync::{Arc, Mutex};

use log::LevelFilter;

use panloop_core::io::{SerialPort, UdpSender};
use panloop_core::pelco::parser::{MessageKind, StreamParser};
use panloop_core::pelco::{Axis, Message};
use panloop_core::{Config, DispatchMode, Scheduler, logger, signal};

enum Transport {
    Serial(SerialPort),
    Udp(UdpSender),
    DryRun,
}

impl Transport {
    fn send_frame(&mut self, frame: &Message) {
        let bytes = frame.to_bytes();
        let result = match self {
            Transport::Serial(port) => port.write_all(&bytes),
            Transport::Udp(sender) => sender.send(&bytes).map(|_| ()),
            Transport::DryRun => {
                println!("{frame}");
                Ok(())
            }
        };
        if let Err(e) = result {
            log::error!("transport send failed: {e}");
        }
    }

    fn poll(&mut self, buf: &mut [u8]) -> usize {
        match self {
            Transport::Serial(port) => match port.bytes_available() {
                Ok(0) | Err(_) => 0,
                Ok(n) => {
                    let want = n.min(buf.len());
                    port.read(&mut buf[..want]).unwrap_or(0)
                }
            },
            // The UDP adapter is send-only; nothing to poll.
            Transport::Udp(_) | Transport::DryRun => 0,
        }
    }
}

pub fn run(config_path: Option<&str>, mode: &str, stats_json: Option<&str>) {
    let config = match config_path {
        Some(path) => match Config::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error loading {path}: {e}");
                std::process::exit(1);
            }
        },
        None => Config::default(),
    };

    init_logging(&config);

    let mode = if mode == "threaded" {
        DispatchMode::Threaded
    } else {
        DispatchMode::Inline
    };

    let address = config.get_u32("camera_address").unwrap_or(1) as u8;
    let query_interval = config.get_u32("query_interval_ms").unwrap_or(500);
    let monitor_interval = config.get_u32("monitor_interval_ms").unwrap_or(100);

    let transport = Arc::new(Mutex::new(open_transport(&config)));

    let mut sched = match Scheduler::with_mode(16, mode) {
        Ok(sched) => sched,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    let t = Arc::clone(&transport);
    sched
        .add_task("query_pan_position", query_interval, 0, move || {
            let frame = Message::query_position(address, Axis::Pan);
            t.lock().unwrap().send_frame(&frame);
        })
        .expect("task table has room");

    let t = Arc::clone(&transport);
    sched
        .add_task("query_tilt_position", query_interval, 0, move || {
            let frame = Message::query_position(address, Axis::Tilt);
            t.lock().unwrap().send_frame(&frame);
        })
        .expect("task table has room");

    // Responses outrank queries so a full tick drains the line first.
    let t = Arc::clone(&transport);
    let mut parser = StreamParser::new();
    sched
        .add_task("monitor_positions", monitor_interval, 1, move || {
            let mut buf = [0u8; 256];
            let n = t.lock().unwrap().poll(&mut buf);
            if n == 0 {
                return;
            }
            for parsed in parser.drain(&buf[..n]) {
                match parsed.kind {
                    MessageKind::PanPosition { degrees } => {
                        log::info!("pan position: {degrees} degrees");
                    }
                    MessageKind::TiltPosition { degrees } => {
                        log::info!("tilt position: {degrees} degrees");
                    }
                    MessageKind::Unknown => log::debug!("frame: {}", parsed.frame),
                }
            }
        })
        .expect("task table has room");

    signal::install_handlers();
    println!("panloop running — Ctrl+C to stop");
    sched.run();

    print_stats(&sched);
    if let Some(path) = stats_json {
        write_stats_json(&sched, path);
    }
}

fn init_logging(config: &Config) {
    let level = match config.get("log_level").unwrap_or("debug") {
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    match config.get("log_file") {
        Some(path) => {
            if let Err(e) = logger::init(path, level) {
                eprintln!("Error opening log file {path}: {e}");
                std::process::exit(1);
            }
        }
        None => {
            let _ = env_logger::Builder::new().filter_level(level).try_init();
        }
    }
}

fn open_transport(config: &Config) -> Transport {
    match config.get("transport") {
        Some("serial") => {
            let device = config.get("serial_device").unwrap_or("/dev/ttyUSB0");
            let baud = config.get_u32("serial_baud").unwrap_or(9600);
            match SerialPort::open(device, baud) {
                Ok(mut port) => {
                    // The monitor task polls; never stall a tick on the line.
                    if let Err(e) = port.set_blocking(false) {
                        log::warn!("serial non-blocking setup failed: {e}");
                    }
                    log::info!("serial transport on {device} at {baud} baud");
                    Transport::Serial(port)
                }
                Err(e) => {
                    eprintln!("Error opening serial device {device}: {e}");
                    std::process::exit(1);
                }
            }
        }
        Some("udp") => {
            let host = config.get("udp_host").unwrap_or("127.0.0.1");
            let port = config.get_u16("udp_port").unwrap_or(9000);
            match UdpSender::connect(host, port) {
                Ok(sender) => {
                    log::info!("udp transport to {}", sender.peer());
                    Transport::Udp(sender)
                }
                Err(e) => {
                    eprintln!("Error connecting UDP to {host}:{port}: {e}");
                    std::process::exit(1);
                }
            }
        }
        _ => {
            log::info!("no transport configured; printing frames");
            Transport::DryRun
        }
    }
}

fn print_stats(sched: &Scheduler) {
    println!("\nTask statistics:");
    println!(
        "{:<24} {:>5} {:>8} {:>8} {:>8} {:>9}",
        "Task", "Prio", "Runs", "Avg ms", "Max ms", "Overruns"
    );
    println!("{}", "-".repeat(68));
    for snap in sched.snapshots() {
        println!(
            "{:<24} {:>5} {:>8} {:>8} {:>8} {:>9}",
            snap.name, snap.priority, snap.run_count, snap.avg_ms, snap.max_duration_ms,
            snap.overrun_count
        );
    }
}

fn write_stats_json(sched: &Scheduler, path: &str) {
    let snapshots = sched.snapshots();
    match std::fs::File::create(path) {
        Ok(file) => {
            if let Err(e) = serde_json::to_writer_pretty(file, &snapshots) {
                eprintln!("Error writing stats to {path}: {e}");
            } else {
                println!("Stats written to {path}");
            }
        }
        Err(e) => eprintln!("Error creating {path}: {e}"),
    }
}
