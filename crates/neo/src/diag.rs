//! # Diagnostics: UDP Snapshots for `neo-telemetry`
//!
//! Enabled by the `diagnostics` feature. When the engine is configured with
//! `attach_diagnostics`, a [`DiagSender`] resource is inserted into the world
//! and [`send_diagnostics`] runs once per frame, throttled to 10 Hz. Each
//! send serializes a JSON [`DiagSnapshot`] into one datagram to
//! `127.0.0.1:9100`.
//!
//! ```text
//!  Engine::tick ──► send_diagnostics ──(10 Hz)──► UDP 127.0.0.1:9100 ──► neo-telemetry
//!                        ▲
//!   log::info!() ──► DiagLogger ──► ring (500) ──┘ drained 50 per send
//!                        └──► env_logger (stderr)
//! ```

use std::collections::VecDeque;
use std::net::UdpSocket;
use std::sync::{Mutex, OnceLock};
use std::time::{Duration, Instant};

use log::Log;
use serde::Serialize;

use crate::ecs::World;
use crate::ecs::system::SystemTiming;
use crate::render::RenderStats;
use crate::time::Time;

/// Where the telemetry TUI listens.
pub const TELEMETRY_ADDR: &str = "127.0.0.1:9100";
const SEND_INTERVAL: Duration = Duration::from_millis(100);
const LOG_CAPACITY: usize = 500;
const LOGS_PER_SEND: usize = 50;

// ── DiagSender ───────────────────────────────────────────────────────────

/// Resource owning the outbound socket and the throttle clock.
pub struct DiagSender {
    socket: UdpSocket,
    last_send: Option<Instant>,
}

impl DiagSender {
    /// Binds an ephemeral local port aimed at [`TELEMETRY_ADDR`]. `None` when
    /// the socket cannot be set up; diagnostics are optional.
    pub fn new() -> Option<Self> {
        Self::connect(TELEMETRY_ADDR)
    }

    pub fn connect(addr: &str) -> Option<Self> {
        let socket = UdpSocket::bind("127.0.0.1:0").ok()?;
        socket.connect(addr).ok()?;
        socket.set_nonblocking(true).ok()?;
        log::info!("diagnostics sending to {addr}");
        Some(Self {
            socket,
            last_send: None,
        })
    }

    /// True when enough time has passed since the last send; arms the
    /// throttle if so.
    fn due(&mut self, now: Instant) -> bool {
        if self
            .last_send
            .is_some_and(|last| now.duration_since(last) < SEND_INTERVAL)
        {
            return false;
        }
        self.last_send = Some(now);
        true
    }
}

// ── Gathered Stats ───────────────────────────────────────────────────────

/// Game object pool statistics, taken from the world once per send.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub total_slots: u32,
    pub free_count: usize,
    pub alive_count: usize,
    pub created_this_frame: u32,
    pub destroyed_this_frame: u32,
}

/// How long the last frame's systems and render took.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameBudget {
    pub systems_us: f64,
    pub render_us: f64,
}

// ── Snapshot (wire format) ───────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DiagSnapshot {
    pub app_name: String,
    pub fps: f32,
    pub delta_ms: f32,
    pub frame_count: u64,
    pub elapsed_secs: f32,
    pub game_object_count: usize,
    pub archetype_count: usize,
    pub components: Vec<ComponentCount>,
    pub system_timings: Vec<SystemTimingWire>,
    pub passes: Vec<PassWire>,
    pub frame_budget: FrameBudgetWire,
    pub pool: PoolWire,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub logs: Vec<LogEntryWire>,
}

#[derive(Debug, Serialize)]
pub struct ComponentCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SystemTimingWire {
    pub name: String,
    pub active: bool,
    pub duration_us: f64,
}

#[derive(Debug, Serialize)]
pub struct PassWire {
    pub name: String,
    pub phase: String,
    pub active: bool,
    pub draws: u32,
    pub culled: u32,
}

#[derive(Debug, Serialize)]
pub struct FrameBudgetWire {
    pub systems_us: f64,
    pub render_us: f64,
}

#[derive(Debug, Serialize)]
pub struct PoolWire {
    pub total_slots: u32,
    pub free_count: usize,
    pub alive_count: usize,
    pub created_this_frame: u32,
    pub destroyed_this_frame: u32,
    pub fragmentation_pct: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntryWire {
    pub level: String,
    pub target: String,
    pub message: String,
    pub timestamp_secs: f32,
}

/// Builds a snapshot of the world. Resets the pool's per-frame counters.
pub(crate) fn snapshot(
    world: &mut World,
    app_name: &str,
    timings: &[SystemTiming],
    budget: FrameBudget,
    logs: Vec<LogEntryWire>,
) -> DiagSnapshot {
    let time = world.get_resource::<Time>().copied().unwrap_or_default();
    let passes = world
        .get_resource::<RenderStats>()
        .map(|stats| {
            stats
                .passes
                .iter()
                .map(|p| PassWire {
                    name: p.name.clone(),
                    phase: format!("{:?}", p.phase),
                    active: p.active,
                    draws: p.draws,
                    culled: p.culled,
                })
                .collect()
        })
        .unwrap_or_default();

    let pool = world.take_pool_stats();
    let fragmentation_pct = if pool.total_slots > 0 {
        pool.free_count as f32 / pool.total_slots as f32 * 100.0
    } else {
        0.0
    };

    DiagSnapshot {
        app_name: app_name.to_string(),
        fps: time.fps(),
        delta_ms: time.delta_secs() * 1000.0,
        frame_count: time.frame_count(),
        elapsed_secs: time.elapsed_secs(),
        game_object_count: world.game_object_count(),
        archetype_count: world.archetype_count(),
        components: world
            .component_counts()
            .into_iter()
            .map(|(name, count)| ComponentCount { name, count })
            .collect(),
        system_timings: timings
            .iter()
            .map(|t| SystemTimingWire {
                name: t.name.clone(),
                active: t.active,
                duration_us: t.duration_us,
            })
            .collect(),
        passes,
        frame_budget: FrameBudgetWire {
            systems_us: budget.systems_us,
            render_us: budget.render_us,
        },
        pool: PoolWire {
            total_slots: pool.total_slots,
            free_count: pool.free_count,
            alive_count: pool.alive_count,
            created_this_frame: pool.created_this_frame,
            destroyed_this_frame: pool.destroyed_this_frame,
            fragmentation_pct,
        },
        logs,
    }
}

/// Called once per frame by the engine. Does nothing without a
/// [`DiagSender`] resource or inside the 100 ms throttle window.
pub(crate) fn send_diagnostics(world: &mut World, app_name: &str, timings: &[SystemTiming], budget: FrameBudget) {
    let due = world
        .get_resource_mut::<DiagSender>()
        .is_some_and(|sender| sender.due(Instant::now()));
    if !due {
        return;
    }

    let snapshot = snapshot(world, app_name, timings, budget, drain_captured_logs(LOGS_PER_SEND));
    let Some(sender) = world.get_resource::<DiagSender>() else {
        return;
    };
    // Fire and forget: nobody listening is the common case.
    if let Ok(json) = serde_json::to_vec(&snapshot) {
        let _ = sender.socket.send(&json);
    }
}

// ── Log Capture ──────────────────────────────────────────────────────────

/// Bounded log history; the oldest entry goes first.
struct LogRing {
    entries: VecDeque<LogEntryWire>,
}

impl LogRing {
    fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(LOG_CAPACITY),
        }
    }

    fn push(&mut self, entry: LogEntryWire) {
        if self.entries.len() >= LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    fn drain(&mut self, max: usize) -> Vec<LogEntryWire> {
        let n = self.entries.len().min(max);
        self.entries.drain(..n).collect()
    }
}

static LOG_RING: Mutex<Option<LogRing>> = Mutex::new(None);
static LOG_START: OnceLock<Instant> = OnceLock::new();
static DIAG_LOGGER: OnceLock<DiagLogger> = OnceLock::new();

/// Captures every record into the ring and forwards it to env_logger.
struct DiagLogger {
    inner: env_logger::Logger,
}

impl Log for DiagLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.inner.enabled(metadata) || metadata.level() <= log::Level::Info
    }

    fn log(&self, record: &log::Record) {
        if self.inner.enabled(record.metadata()) {
            self.inner.log(record);
        }
        capture(LogEntryWire {
            level: record.level().to_string(),
            target: record.target().to_string(),
            message: record.args().to_string(),
            timestamp_secs: LOG_START.get().map_or(0.0, |s| s.elapsed().as_secs_f32()),
        });
    }

    fn flush(&self) {
        self.inner.flush();
    }
}

fn capture(entry: LogEntryWire) {
    if let Ok(mut guard) = LOG_RING.lock() {
        if let Some(ring) = guard.as_mut() {
            ring.push(entry);
        }
    }
}

/// Installs the capturing logger. Info and above always reach the ring;
/// stderr output follows `RUST_LOG` as usual. Returns `false` when another
/// logger was already installed, in which case nothing is captured.
pub fn init_logger() -> bool {
    if let Ok(mut ring) = LOG_RING.lock() {
        ring.get_or_insert_with(LogRing::new);
    }
    LOG_START.get_or_init(Instant::now);

    let inner = env_logger::Builder::new().parse_default_env().build();
    let max_level = inner.filter();
    let logger = DIAG_LOGGER.get_or_init(|| DiagLogger { inner });

    if log::set_logger(logger).is_err() {
        eprintln!("[neo] a logger is already set, log capture disabled");
        return false;
    }
    log::set_max_level(max_level.max(log::LevelFilter::Info));
    true
}

/// Takes up to `max` of the oldest captured entries.
pub(crate) fn drain_captured_logs(max: usize) -> Vec<LogEntryWire> {
    match LOG_RING.lock() {
        Ok(mut guard) => guard.as_mut().map_or_else(Vec::new, |ring| ring.drain(max)),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(i: usize) -> LogEntryWire {
        LogEntryWire {
            level: "INFO".into(),
            target: "neo".into(),
            message: format!("line {i}"),
            timestamp_secs: i as f32,
        }
    }

    #[test]
    fn ring_keeps_the_newest_entries() {
        let mut ring = LogRing::new();
        for i in 0..LOG_CAPACITY + 20 {
            ring.push(entry(i));
        }
        assert_eq!(ring.entries.len(), LOG_CAPACITY);
        let first = ring.drain(LOGS_PER_SEND);
        assert_eq!(first.len(), LOGS_PER_SEND);
        assert_eq!(first[0].message, "line 20");
        assert_eq!(ring.entries.len(), LOG_CAPACITY - LOGS_PER_SEND);
    }

    #[test]
    fn sends_are_throttled_to_ten_hertz() {
        let Some(mut sender) = DiagSender::connect("127.0.0.1:9") else {
            return;
        };
        let start = Instant::now();
        assert!(sender.due(start));
        assert!(!sender.due(start + Duration::from_millis(50)));
        assert!(sender.due(start + Duration::from_millis(120)));
    }

    #[test]
    fn snapshot_serializes_world_counts() {
        #[derive(Debug)]
        struct Marker;

        let mut world = World::new();
        let mut time = Time::new();
        time.advance(Duration::from_millis(16));
        world.insert_resource(time);
        world.spawn_one(Marker);
        let doomed = world.spawn_one(Marker);
        world.destroy(doomed);

        let timings = [SystemTiming {
            name: "Frustum System".into(),
            active: true,
            duration_us: 12.5,
        }];
        let snap = snapshot(&mut world, "test", &timings, FrameBudget::default(), vec![entry(0)]);
        assert_eq!(snap.game_object_count, 1);
        assert_eq!(snap.components[0].name, "Marker");
        assert_eq!(snap.pool.created_this_frame, 2);
        assert_eq!(snap.pool.destroyed_this_frame, 1);

        let json: serde_json::Value = serde_json::to_value(&snap).unwrap();
        assert_eq!(json["system_timings"][0]["name"], "Frustum System");
        assert_eq!(json["frame_count"], 1);
        assert_eq!(json["logs"][0]["message"], "line 0");

        // Counters reset once taken.
        let again = snapshot(&mut world, "test", &[], FrameBudget::default(), Vec::new());
        assert_eq!(again.pool.created_this_frame, 0);
        assert!(serde_json::to_value(&again).unwrap().get("logs").is_none());
    }
}
