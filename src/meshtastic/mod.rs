//! # Meshtastic Device Communication Module
//!
//! This module provides communication interfaces with Meshtastic devices, supporting both
//! text-based and protocol buffer communication modes. It handles device connection management,
//! message parsing, and event processing.
//!
//! ## Features
//!
//! - **Serial Communication**: Connect to Meshtastic devices via USB/UART
//! - **Protocol Support**: Both text parsing and protobuf decoding
//! - **Event Processing**: Convert raw device messages to structured events
//! - **SLIP Decoding**: Handle SLIP-encoded protocol buffer frames
//!
//! ## Communication Modes
//!
//! ### Text Mode (Default)
//! ```rust,no_run
//! # #[cfg(feature = "serial")]
//! # {
//! use meshbbs::meshtastic::MeshtasticDevice;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // Create device connection
//!     let mut device = MeshtasticDevice::new("/dev/ttyUSB0", 115200).await?;
//!     
//!     // Receive text messages
//!     while let Some(message) = device.receive_message().await? {
//!         println!("Received: {}", message);
//!     }
//!     Ok(())
//! }
//! # }
//! ```
//!
//! ### Protocol Buffer Mode (with `meshtastic-proto` feature)
//! When enabled, provides rich packet decoding for positions, node info, telemetry, etc.
//!
//! ## Event Types
//!
//! When the `meshtastic-proto` feature is enabled, the module produces `TextEvent`
//! instances that represent different types of communication from the mesh network:
//!
//! - **Messages**: Text communications between nodes
//! - **Node Info**: Device information and capabilities
//! - **Position**: GPS location data
//! - **Telemetry**: Device metrics and sensor data
//!
//! ## Error Handling
//!
//! The module provides robust error handling for:
//! - Device connection failures
//! - Serial communication errors
//! - Protocol parsing issues
//! - Timeout conditions
//!
//! ## Configuration
//!
//! Device parameters are typically configured via the main configuration system:
//!
//! ```toml
//! [meshtastic]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! # node_id = "0x1234ABCD"  # optional; decimal or 0xHEX; used only as a display fallback
//! channel = 0
//! ```

use crate::logutil::escape_log; // for sanitizing log output
#[cfg(feature = "meshtastic-proto")]
use anyhow::anyhow;
use anyhow::Result;
use log::{debug, info};
#[cfg(feature = "meshtastic-proto")]
use log::{error, trace, warn};
#[cfg(feature = "meshtastic-proto")]
use std::collections::VecDeque;
#[cfg(feature = "meshtastic-proto")]
use std::sync::{Arc, Mutex};
#[cfg(feature = "meshtastic-proto")]
use tokio::sync::mpsc;
use tokio::time::{sleep, Duration};

/// Priority level for outgoing messages
#[derive(Debug, Clone)]
pub enum MessagePriority {
    High,   // Direct messages with want_ack for immediate transmission
    Normal, // Regular broadcasts
}

/// Kind of outgoing message (normal vs internally generated retry)
#[derive(Debug, Clone, Default)]
pub enum OutgoingKind {
    #[default]
    Normal,
    /// Retry of a previously sent reliable DM (identified by original packet id)
    Retry { id: u32 },
}

/// Outgoing message structure for the writer task
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub to_node: Option<u32>, // None for broadcast, Some(node_id) for direct
    pub channel: u32,         // Channel index (0 = primary)
    pub content: String,      // Message content
    pub priority: MessagePriority,
    pub kind: OutgoingKind, // Normal or Retry
    /// Request an ACK even for broadcasts. When true, writer will set want_ack and
    /// assign a non-zero id for correlation. For direct messages this flag is ignored
    /// because DMs are always sent reliable with want_ack.
    pub request_ack: bool,
}

/// Writer tuning parameters, typically sourced from Config
#[derive(Debug, Clone)]
pub struct WriterTuning {
    /// Minimum gap between any text sends (ms). Enforced with a hard lower bound of 2000ms.
    pub min_send_gap_ms: u64,
    /// Retransmit backoff schedule in seconds, e.g. [4, 8, 16]. Must be non-empty; values <=0 ignored.
    pub dm_resend_backoff_seconds: Vec<u64>,
    /// Additional pacing delay for a broadcast sent immediately after a reliable DM (ms)
    pub post_dm_broadcast_gap_ms: u64,
    /// Minimum gap between two consecutive reliable DMs (ms)
    pub dm_to_dm_gap_ms: u64,
}

impl Default for WriterTuning {
    fn default() -> Self {
        Self {
            min_send_gap_ms: 2000,
            dm_resend_backoff_seconds: vec![4, 8, 16],
            post_dm_broadcast_gap_ms: 1200,
            dm_to_dm_gap_ms: 600,
        }
    }
}

/// Control messages for coordinating between tasks
#[derive(Debug)]
pub enum ControlMessage {
    Shutdown,
    #[allow(dead_code)]
    DeviceStatus,
    #[allow(dead_code)]
    ConfigRequest(u32),
    #[allow(dead_code)]
    Heartbeat,
    SetNodeId(u32),
    /// Correlated ACK from radio for a previously sent reliable packet (reply_id)
    AckReceived(u32),
    /// Routing error reported by radio for a particular request/reply id (value per proto::routing::Error)
    RoutingError {
        id: u32,
        reason: i32,
    },
    /// Send a ping to a node and notify on ACK/failure via response channel
    SendPing {
        to: u32,
        channel: u32,
        response_tx: tokio::sync::oneshot::Sender<bool>,
    },
    /// Provide scheduler handle to writer after creation (avoids circular ownership at construction)
    #[allow(dead_code)]
    SetSchedulerHandle(crate::bbs::dispatch::SchedulerHandle),
}

#[cfg(feature = "meshtastic-proto")]
use crate::metrics;
#[cfg(feature = "meshtastic-proto")]
use crate::protobuf::meshtastic_generated as proto;
#[cfg(feature = "meshtastic-proto")]
use bytes::BytesMut; // metrics module

// Provide hex_snippet early so it is in scope for receive_message (always available)
fn hex_snippet(data: &[u8], max: usize) -> String {
    use std::cmp::min;
    data.iter()
        .take(min(max, data.len()))
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join("")
}

// UTF-8 safe truncation for log display. Ensures we do not slice inside a multi-byte char.
// If the input exceeds max_bytes, returns an escaped, truncated string with an ellipsis appended.
// Otherwise returns the escaped original string.
fn truncate_for_log(input: &str, max_bytes: usize) -> String {
    if input.len() <= max_bytes {
        return escape_log(input);
    }
    // Reserve 3 bytes for the ellipsis
    let reserve = 3usize;
    let cut_target = max_bytes.saturating_sub(reserve);
    let mut cut = cut_target;
    while cut > 0 && !input.is_char_boundary(cut) {
        cut -= 1;
    }
    // Fallback: if for some reason cut became 0 (pathological), avoid empty add by using full escape of empty
    let mut out = escape_log(&input[..cut]);
    out.push_str("...");
    out
}


#[cfg(feature = "meshtastic-proto")]
fn fmt_percent(val: f32) -> String {
    if val.is_finite() {
        if val <= 1.0 {
            format!("{:.0}%", val * 100.0)
        } else {
            format!("{:.0}%", val)
        }
    } else {
        "na".to_string()
    }
}

#[cfg(feature = "meshtastic-proto")]
fn summarize_known_port_payload(port: proto::PortNum, payload: &[u8]) -> Option<String> {
    use bytes::BytesMut;
    use prost::Message;
    match port {
        proto::PortNum::TelemetryApp => {
            let mut b = BytesMut::from(payload).freeze();
            if let Ok(t) = proto::Telemetry::decode(&mut b) {
                if let Some(variant) = t.variant {
                    use proto::telemetry::Variant as TVar;
                    match variant {
                        TVar::DeviceMetrics(dm) => {
                            let mut parts: Vec<String> = Vec::new();
                            if let Some(batt) = dm.battery_level {
                                parts.push(format!("batt={}{}", batt, "%"));
                            }
                            if let Some(v) = dm.voltage {
                                parts.push(format!("v={:.2}V", v));
                            }
                            if let Some(up) = dm.uptime_seconds {
                                parts.push(format!("up={}s", up));
                            }
                            if let Some(util) = dm.channel_utilization {
                                parts.push(format!("util={}", fmt_percent(util)));
                            }
                            if let Some(tx) = dm.air_util_tx {
                                parts.push(format!("tx={}", fmt_percent(tx)));
                            }
                            if !parts.is_empty() {
                                return Some(format!("telemetry/device {}", parts.join(" ")));
                            }
                            return Some("telemetry/device".to_string());
                        }
                        TVar::EnvironmentMetrics(env) => {
                            let mut parts: Vec<String> = Vec::new();
                            if let Some(t) = env.temperature {
                                parts.push(format!("temp={:.1}C", t));
                            }
                            if let Some(h) = env.relative_humidity {
                                parts.push(format!("hum={:.0}%", h));
                            }
                            if let Some(p) = env.barometric_pressure {
                                parts.push(format!("press={:.0}hPa", p));
                            }
                            if !parts.is_empty() {
                                return Some(format!("telemetry/env {}", parts.join(" ")));
                            }
                            return Some("telemetry/env".to_string());
                        }
                        TVar::LocalStats(ls) => {
                            let mut parts: Vec<String> = Vec::new();
                            parts.push(format!("up={}s", ls.uptime_seconds));
                            parts.push(format!("util={}", fmt_percent(ls.channel_utilization)));
                            parts.push(format!("tx={}", fmt_percent(ls.air_util_tx)));
                            parts.push(format!(
                                "rx={} bad={} dupe={}",
                                ls.num_packets_rx, ls.num_packets_rx_bad, ls.num_rx_dupe
                            ));
                            return Some(format!("telemetry/local {}", parts.join(" ")));
                        }
                        TVar::PowerMetrics(_) => return Some("telemetry/power".to_string()),
                        TVar::AirQualityMetrics(_) => return Some("telemetry/air".to_string()),
                        TVar::HealthMetrics(_) => return Some("telemetry/health".to_string()),
                        TVar::HostMetrics(_) => return Some("telemetry/host".to_string()),
                    }
                }
                return Some("telemetry".to_string());
            }
            None
        }
        proto::PortNum::PositionApp => {
            let mut b = BytesMut::from(payload).freeze();
            if let Ok(pos) = proto::Position::decode(&mut b) {
                let lat = pos.latitude_i.map(|v| v as f64 * 1e-7);
                let lon = pos.longitude_i.map(|v| v as f64 * 1e-7);
                let alt = pos.altitude.or(pos.altitude_hae);
                let mut parts = Vec::new();
                if let (Some(la), Some(lo)) = (lat, lon) {
                    parts.push(format!("lat={:.5} lon={:.5}", la, lo));
                }
                if let Some(a) = alt {
                    parts.push(format!("alt={}m", a));
                }
                if parts.is_empty() {
                    None
                } else {
                    Some(format!("position {}", parts.join(" ")))
                }
            } else {
                None
            }
        }
        proto::PortNum::NodeinfoApp => {
            let mut b = BytesMut::from(payload).freeze();
            if let Ok(u) = proto::User::decode(&mut b) {
                let ln = u.long_name.trim();
                let sn = u.short_name.trim();
                if !ln.is_empty() || !sn.is_empty() {
                    if !ln.is_empty() && !sn.is_empty() {
                        Some(format!("user {} ({})", ln, sn))
                    } else {
                        Some(format!("user {}{}", ln, sn))
                    }
                } else {
                    Some("user".to_string())
                }
            } else {
                None
            }
        }
        _ => None,
    }
}

#[cfg(feature = "meshtastic-proto")]
pub mod slip; // restore SLIP decoder (Meshtastic uses SLIP over some transports)

#[cfg(feature = "serial")]
use serialport::SerialPort;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Cached node information with timestamp for persistence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedNodeInfo {
    pub node_id: u32,
    pub long_name: String,
    pub short_name: String,
    pub last_seen: DateTime<Utc>,
    pub first_seen: DateTime<Utc>,
}

/// Node cache for persistent storage
#[derive(Debug, Serialize, Deserialize)]
pub struct NodeCache {
    pub nodes: std::collections::HashMap<u32, CachedNodeInfo>,
    pub last_updated: DateTime<Utc>,
}

impl NodeCache {
    pub fn new() -> Self {
        Self {
            nodes: std::collections::HashMap::new(),
            last_updated: Utc::now(),
        }
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        // Guard against accidental leading NULs from previous partial writes
        let cleaned = content.trim_start_matches('\0');
        let cache: NodeCache = serde_json::from_str(cleaned)?;
        Ok(cache)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        use std::fs::{self as sfs, File, OpenOptions};
        use std::io::Write;
        let path_ref = path.as_ref();
        let content = serde_json::to_string_pretty(self)?;

        // Create parent directories if needed
        if let Some(parent) = path_ref.parent() {
            let _ = sfs::create_dir_all(parent);
        }

        // Create a unique temp file in the same directory
        let dir = path_ref.parent().unwrap_or_else(|| Path::new("."));
        let base = path_ref
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("node_cache.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&candidate)
            {
                Ok(mut tmp) => {
                    tmp.write_all(content.as_bytes())?;
                    tmp.flush()?;
                    let _ = tmp.sync_all();
                    break candidate;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                    continue;
                }
                Err(e) => {
                    return Err(anyhow::anyhow!(
                        "Failed to create temp file for atomic write: {}",
                        e
                    ))
                }
            }
        };

        // Atomically replace destination and fsync directory
        sfs::rename(&tmp_path, path_ref)?;
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        Ok(())
    }

    pub fn update_node(&mut self, node_id: u32, long_name: String, short_name: String) {
        let now = Utc::now();
        self.nodes
            .entry(node_id)
            .and_modify(|n| {
                n.long_name = long_name.clone();
                n.short_name = short_name.clone();
                n.last_seen = now;
            })
            .or_insert(CachedNodeInfo {
                node_id,
                long_name,
                short_name,
                last_seen: now,
                first_seen: now,
            });
        self.last_updated = now;
    }

    #[allow(dead_code)]
    pub fn remove_stale_nodes(&mut self, max_age_days: u32) -> usize {
        let cutoff = Utc::now() - chrono::Duration::days(max_age_days as i64);
        let initial_count = self.nodes.len();
        self.nodes.retain(|_, node| node.last_seen > cutoff);
        let removed = initial_count - self.nodes.len();
        if removed > 0 {
            self.last_updated = Utc::now();
        }
        removed
    }
}

impl Default for NodeCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Represents a connection to a Meshtastic device
pub struct MeshtasticDevice {
    #[allow(dead_code)]
    port_name: String,
    #[allow(dead_code)]
    baud_rate: u32,
    #[cfg(feature = "serial")]
    port: Option<Box<dyn SerialPort>>,
    #[cfg(feature = "meshtastic-proto")]
    slip: slip::SlipDecoder,
    #[cfg(feature = "meshtastic-proto")]
    config_request_id: Option<u32>,
    #[cfg(feature = "meshtastic-proto")]
    have_my_info: bool,
    #[cfg(feature = "meshtastic-proto")]
    have_radio_config: bool,
    #[cfg(feature = "meshtastic-proto")]
    have_module_config: bool,
    #[cfg(feature = "meshtastic-proto")]
    config_complete: bool,
    #[cfg(feature = "meshtastic-proto")]
    nodes: std::collections::HashMap<u32, proto::NodeInfo>,
    #[cfg(feature = "meshtastic-proto")]
    node_cache: NodeCache,
    #[cfg(feature = "meshtastic-proto")]
    cache_file_path: String,
    #[cfg(feature = "meshtastic-proto")]
    binary_frames_seen: bool,
    #[cfg(feature = "meshtastic-proto")]
    last_want_config_sent: Option<std::time::Instant>,
    #[cfg(feature = "meshtastic-proto")]
    rx_buf: Vec<u8>, // accumulation buffer for length-prefixed frames (0x94 0xC3 hdr)
    #[cfg(feature = "meshtastic-proto")]
    text_events: VecDeque<TextEvent>,
    #[cfg(feature = "meshtastic-proto")]
    our_node_id: Option<u32>,
    #[cfg(feature = "meshtastic-proto")]
    node_detection_tx: mpsc::UnboundedSender<NodeDetectionEvent>,
}

/// Structured text event extracted from protobuf packets
#[cfg(feature = "meshtastic-proto")]
#[derive(Debug, Clone)]
pub struct TextEvent {
    pub source: u32,
    #[allow(dead_code)]
    pub dest: Option<u32>,
    pub is_direct: bool,
    pub channel: Option<u32>,
    pub content: String,
}

/// Node detection event for welcome system
#[cfg(feature = "meshtastic-proto")]
#[derive(Debug, Clone)]
pub struct NodeDetectionEvent {
    pub node_id: u32,
    pub long_name: String,
    pub short_name: String,
    pub is_from_startup_queue: bool, // true if from startup queue, false for real-time detections
}

/// Reader task for continuous Meshtastic device reading
#[cfg(feature = "meshtastic-proto")]
pub struct MeshtasticReader {
    #[cfg(feature = "serial")]
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    slip: slip::SlipDecoder,
    rx_buf: Vec<u8>,
    text_event_tx: mpsc::UnboundedSender<TextEvent>,
    node_detection_tx: mpsc::UnboundedSender<NodeDetectionEvent>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    writer_control_tx: mpsc::UnboundedSender<ControlMessage>,
    // Notify the server of our node ID once known (for ident beacons)
    node_id_tx: mpsc::UnboundedSender<u32>,
    node_cache: NodeCache,
    cache_file_path: String,
    nodes: std::collections::HashMap<u32, proto::NodeInfo>,
    our_node_id: Option<u32>,
    binary_frames_seen: bool,
}

/// Writer task for Meshtastic device writing
#[cfg(feature = "meshtastic-proto")]
pub struct MeshtasticWriter {
    #[cfg(feature = "serial")]
    port: Arc<Mutex<Box<dyn SerialPort>>>,
    outgoing_rx: mpsc::UnboundedReceiver<OutgoingMessage>,
    control_rx: mpsc::UnboundedReceiver<ControlMessage>,
    our_node_id: Option<u32>,
    config_request_id: Option<u32>,
    last_want_config_sent: Option<std::time::Instant>,
    // Track pending reliable sends awaiting ACK
    pending: std::collections::HashMap<u32, PendingSend>,
    // Track broadcast ACKs (no retries). Keyed by packet id, expires after short TTL.
    pending_broadcast: std::collections::HashMap<u32, BroadcastPending>,
    // Track pending ping requests: packet_id -> (target_node_id, response_channel)
    pending_pings: std::collections::HashMap<u32, (u32, tokio::sync::oneshot::Sender<bool>)>,
    // Pacing: time of the last high-priority (reliable DM) send to avoid rate limiting
    last_high_priority_sent: Option<std::time::Instant>,
    // Gating: enforce a minimum interval between any text packet transmissions
    last_text_send: Option<std::time::Instant>,
    // Configuration tuning
    tuning: WriterTuning,
    // Optional scheduler handle for enqueuing retry envelopes
    scheduler: Option<crate::bbs::dispatch::SchedulerHandle>,
}

#[derive(Debug, Clone)]
struct PendingSend {
    to: u32,
    channel: u32,
    full_content: String,
    content_preview: String,
    attempts: u8,
    // When the next resend attempt is allowed (based on backoff schedule)
    next_due: std::time::Instant,
    // Index into BACKOFF_SECONDS for next scheduling step (capped at last)
    backoff_idx: u8,
    // Original send timestamp for latency metrics
    sent_at: std::time::Instant,
}

#[derive(Debug, Clone)]
struct BroadcastPending {
    channel: u32,
    preview: String,
    expires_at: std::time::Instant,
}

impl MeshtasticDevice {
    #[cfg(feature = "meshtastic-proto")]
    pub fn format_node_label(&self, id: u32) -> String {
        if let Some(info) = self.nodes.get(&id) {
            if let Some(user) = &info.user {
                let ln = user.long_name.trim();
                if !ln.is_empty() {
                    return ln.to_string();
                }
            }
        }
        // Fallback to short uppercase hex (similar to Meshtastic short name style but simplified)
        format!("0x{:06X}", id & 0xFFFFFF)
    }

    #[cfg(feature = "meshtastic-proto")]
    pub fn format_node_short_label(&self, id: u32) -> String {
        if let Some(info) = self.nodes.get(&id) {
            if let Some(user) = &info.user {
                let sn = user.short_name.trim();
                if !sn.is_empty() {
                    return sn.to_string();
                }
            }
        }
        format!("0x{:06X}", id & 0xFFFFFF)
    }

    #[cfg(feature = "meshtastic-proto")]
    pub fn format_node_combined(&self, id: u32) -> (String, String) {
        let short = self.format_node_short_label(id);
        let long = self.format_node_label(id);
        (short, long)
    }

    #[cfg(feature = "meshtastic-proto")]
    #[allow(dead_code)]
    pub fn our_node_id(&self) -> Option<u32> {
        self.our_node_id
    }
    // ---------- Public state accessors (read-only) ----------
    #[cfg(feature = "meshtastic-proto")]
    pub fn binary_detected(&self) -> bool {
        self.binary_frames_seen
    }
    #[cfg(feature = "meshtastic-proto")]
    pub fn is_config_complete(&self) -> bool {
        self.config_complete
    }
    #[cfg(feature = "meshtastic-proto")]
    pub fn have_my_info(&self) -> bool {
        self.have_my_info
    }
    #[cfg(feature = "meshtastic-proto")]
    pub fn have_radio_config(&self) -> bool {
        self.have_radio_config
    }
    #[cfg(feature = "meshtastic-proto")]
    pub fn have_module_config(&self) -> bool {
        self.have_module_config
    }
    #[cfg(feature = "meshtastic-proto")]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
    #[cfg(feature = "meshtastic-proto")]
    pub fn config_request_id_hex(&self) -> Option<String> {
        self.config_request_id.map(|id| format!("0x{:08x}", id))
    }

    /// Load node cache from persistent storage
    #[cfg(feature = "meshtastic-proto")]
    #[allow(dead_code)]
    pub fn load_node_cache(&mut self) -> anyhow::Result<()> {
        if Path::new(&self.cache_file_path).exists() {
            match NodeCache::load_from_file(&self.cache_file_path) {
                Ok(cache) => {
                    debug!(
                        "Loaded {} cached nodes from {}",
                        cache.nodes.len(),
                        self.cache_file_path
                    );
                    // Merge cached nodes into runtime nodes
                    for (node_id, cached_node) in &cache.nodes {
                        if !self.nodes.contains_key(node_id) {
                            let mut node_info = proto::NodeInfo {
                                num: *node_id,
                                ..Default::default()
                            };
                            node_info.user = Some(proto::User {
                                long_name: cached_node.long_name.clone(),
                                short_name: cached_node.short_name.clone(),
                                ..Default::default()
                            });
                            self.nodes.insert(*node_id, node_info);
                        }
                    }
                    self.node_cache = cache;
                    Ok(())
                }
                Err(e) => {
                    warn!("Failed to load node cache: {}", e);
                    Ok(()) // Continue without cache
                }
            }
        } else {
            debug!(
                "No node cache file found at {}, starting fresh",
                self.cache_file_path
            );
            Ok(())
        }
    }

    /// Save node cache to persistent storage
    #[cfg(feature = "meshtastic-proto")]
    pub fn save_node_cache(&self) -> anyhow::Result<()> {
        // Ensure directory exists
        if let Some(parent) = Path::new(&self.cache_file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.node_cache.save_to_file(&self.cache_file_path)
    }

    /// Clean up stale nodes from cache (nodes not seen for specified days)
    #[cfg(feature = "meshtastic-proto")]
    #[allow(dead_code)]
    pub fn cleanup_stale_nodes(&mut self, max_age_days: u32) -> anyhow::Result<usize> {
        let removed = self.node_cache.remove_stale_nodes(max_age_days);
        if removed > 0 {
            debug!("Cleaned up {} stale nodes from cache", removed);
            self.save_node_cache()?;
        }
        Ok(removed)
    }

    /// Create a new Meshtastic device connection
    pub async fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        info!(
            "Initializing Meshtastic device on {} at {} baud",
            port_name, baud_rate
        );

        #[cfg(feature = "serial")]
        {
            let mut builder =
                serialport::new(port_name, baud_rate).timeout(Duration::from_millis(500));
            // Some USB serial adapters need explicit settings
            #[cfg(unix)]
            {
                builder = builder
                    .data_bits(serialport::DataBits::Eight)
                    .stop_bits(serialport::StopBits::One)
                    .parity(serialport::Parity::None);
            }
            let mut port = builder
                .open()
                .map_err(|e| anyhow!("Failed to open serial port {}: {}", port_name, e))?;
            // Toggle DTR/RTS to reset/ensure device wakes (common for ESP32 based boards)
            let _ = port.write_data_terminal_ready(true);
            let _ = port.write_request_to_send(true);
            // Small settle delay
            sleep(Duration::from_millis(150)).await;
            // Clear any existing buffered startup text
            let mut purge_buf = [0u8; 512];
            if let Ok(available) = port.bytes_to_read() {
                if available > 0 {
                    let _ = port.read(&mut purge_buf);
                }
            }
            debug!(
                "Serial port initialized, flushed existing {} bytes",
                purge_buf.len()
            );
            Ok(MeshtasticDevice {
                port_name: port_name.to_string(),
                baud_rate,
                port: Some(port),
                #[cfg(feature = "meshtastic-proto")]
                slip: slip::SlipDecoder::new(),
                #[cfg(feature = "meshtastic-proto")]
                config_request_id: None,
                #[cfg(feature = "meshtastic-proto")]
                have_my_info: false,
                #[cfg(feature = "meshtastic-proto")]
                have_radio_config: false,
                #[cfg(feature = "meshtastic-proto")]
                have_module_config: false,
                #[cfg(feature = "meshtastic-proto")]
                config_complete: false,
                #[cfg(feature = "meshtastic-proto")]
                nodes: std::collections::HashMap::new(),
                #[cfg(feature = "meshtastic-proto")]
                node_cache: NodeCache::new(),
                #[cfg(feature = "meshtastic-proto")]
                cache_file_path: "data/node_cache.json".to_string(),
                #[cfg(feature = "meshtastic-proto")]
                binary_frames_seen: false,
                #[cfg(feature = "meshtastic-proto")]
                last_want_config_sent: None,
                #[cfg(feature = "meshtastic-proto")]
                rx_buf: Vec::new(),
                #[cfg(feature = "meshtastic-proto")]
                text_events: VecDeque::new(),
                #[cfg(feature = "meshtastic-proto")]
                our_node_id: None,
                #[cfg(feature = "meshtastic-proto")]
                node_detection_tx: mpsc::unbounded_channel::<NodeDetectionEvent>().0, // dummy sender, not used
            })
        }

        #[cfg(not(feature = "serial"))]
        {
            log::warn!("Serial support not compiled in, using mock device");
            Ok(MeshtasticDevice {
                port_name: port_name.to_string(),
                baud_rate,
                #[cfg(feature = "meshtastic-proto")]
                slip: slip::SlipDecoder::new(),
                #[cfg(feature = "meshtastic-proto")]
                config_request_id: None,
                #[cfg(feature = "meshtastic-proto")]
                have_my_info: false,
                #[cfg(feature = "meshtastic-proto")]
                have_radio_config: false,
                #[cfg(feature = "meshtastic-proto")]
                have_module_config: false,
                #[cfg(feature = "meshtastic-proto")]
                config_complete: false,
                #[cfg(feature = "meshtastic-proto")]
                nodes: std::collections::HashMap::new(),
                #[cfg(feature = "meshtastic-proto")]
                node_cache: NodeCache::new(),
                #[cfg(feature = "meshtastic-proto")]
                cache_file_path: "data/node_cache.json".to_string(),
                #[cfg(feature = "meshtastic-proto")]
                binary_frames_seen: false,
                #[cfg(feature = "meshtastic-proto")]
                last_want_config_sent: None,
                #[cfg(feature = "meshtastic-proto")]
                rx_buf: Vec::new(),
                #[cfg(feature = "meshtastic-proto")]
                text_events: VecDeque::new(),
                #[cfg(feature = "meshtastic-proto")]
                our_node_id: None,
            })
        }
    }

    /// Receive a message from the device
    pub async fn receive_message(&mut self) -> Result<Option<String>> {
        #[cfg(feature = "serial")]
        {
            if let Some(ref mut port) = self.port {
                let mut buffer = [0; 1024];
                match port.read(&mut buffer) {
                    Ok(bytes_read) if bytes_read > 0 => {
                        let raw_slice = &buffer[..bytes_read];
                        trace!("RAW {} bytes: {}", bytes_read, hex_snippet(raw_slice, 64));
                        // Heuristic: if first byte looks like ASCII '{' or '[' we might be seeing JSON debug output - log it fully
                        if raw_slice[0] == b'{' || raw_slice[0] == b'[' {
                            debug!("ASCII/JSON chunk: {}", String::from_utf8_lossy(raw_slice));
                        }
                        // First, try to interpret as protobuf (framed). Meshtastic typically uses
                        // a length-delimited protobuf framing. Here we do a heuristic attempt.
                        #[cfg(feature = "meshtastic-proto")]
                        // First try Meshtastic wired serial length-prefixed framing: 0x94 0xC3 len_hi len_lo
                        if cfg!(feature = "meshtastic-proto") {
                            self.rx_buf.extend_from_slice(raw_slice);
                            // Attempt to extract as many frames as present
                            'outer: loop {
                                if self.rx_buf.len() < 4 {
                                    break;
                                }
                                // Realign to header if needed
                                if !(self.rx_buf[0] == 0x94 && self.rx_buf[1] == 0xC3) {
                                    // discard until possible header (avoid huge scans)
                                    if let Some(pos) = self.rx_buf.iter().position(|&b| b == 0x94) {
                                        if pos > 0 {
                                            self.rx_buf.drain(0..pos);
                                        }
                                    } else {
                                        self.rx_buf.clear();
                                        break;
                                    }
                                    if self.rx_buf.len() < 4 {
                                        break;
                                    }
                                    if !(self.rx_buf[0] == 0x94 && self.rx_buf[1] == 0xC3) {
                                        continue;
                                    }
                                }
                                let declared =
                                    ((self.rx_buf[2] as usize) << 8) | (self.rx_buf[3] as usize);
                                // Basic sanity cap (avoid absurd lengths)
                                if declared == 0 || declared > 8192 {
                                    // unreasonable, shift one byte
                                    self.rx_buf.drain(0..1);
                                    continue;
                                }
                                if self.rx_buf.len() < 4 + declared {
                                    break;
                                }
                                let frame: Vec<u8> = self.rx_buf[4..4 + declared].to_vec();
                                self.rx_buf.drain(0..4 + declared);
                                if let Some(summary) = self.try_parse_protobuf_frame(&frame) {
                                    self.binary_frames_seen = true;
                                    self.update_state_from_summary(&summary);
                                    return Ok(Some(summary));
                                } else {
                                    // Not a FromRadio; ignore and continue (could be other message type)
                                    continue 'outer;
                                }
                            }
                        }
                        // SLIP framing path: some firmwares emit SLIP encoded protobuf frames
                        #[cfg(feature = "meshtastic-proto")]
                        {
                            let frames = self.slip.push(raw_slice);
                            if !frames.is_empty() {
                                self.binary_frames_seen = true;
                            }
                            for frame in frames {
                                trace!("SLIP frame {} bytes", frame.len());
                                if let Some(summary) = self.try_parse_protobuf_frame(&frame) {
                                    self.update_state_from_summary(&summary);
                                    return Ok(Some(summary));
                                }
                            }
                        }

                        // Fallback: treat as UTF-8 / ANSI diagnostic or simplified text frame
                        let message = String::from_utf8_lossy(raw_slice);
                        debug!("Received text: {}", message.trim());
                        if let Some(parsed) = self.parse_meshtastic_message(&message) {
                            return Ok(Some(parsed));
                        }
                    }
                    Ok(_) => {
                        // No data available
                        sleep(Duration::from_millis(10)).await;
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                        // Timeout is normal
                        sleep(Duration::from_millis(10)).await;
                    }
                    Err(e) => {
                        // Treat EINTR (Interrupted system call) gracefully: occurs during CTRL-C/shutdown signals.
                        if e.kind() == std::io::ErrorKind::Interrupted {
                            debug!("Serial read interrupted (EINTR), likely shutdown in progress");
                            sleep(Duration::from_millis(5)).await;
                            // Return None so outer logic can decide to continue loop without spamming errors
                            return Ok(None);
                        }
                        error!("Serial read error: {}", e);
                        return Err(anyhow!("Serial read error: {}", e));
                    }
                }
            }
        }

        #[cfg(not(feature = "serial"))]
        {
            // Mock implementation for testing
            sleep(Duration::from_millis(100)).await;
        }

        Ok(None)
    }

    /// Send a message to a specific node
    #[allow(dead_code)]
    pub async fn send_message(&mut self, to_node: &str, message: &str) -> Result<()> {
        // When protobuf support is enabled we send a proper MeshPacket so real
        // Meshtastic nodes/app clients will display the reply. Fallback to the
        // legacy ASCII stub otherwise.
        #[cfg(feature = "meshtastic-proto")]
        {
            if let Ok(numeric) = u32::from_str_radix(to_node.trim_start_matches("0x"), 16) {
                // Treat to_node as hex node id; channel 0 (primary) for now.
                self.send_text_packet(Some(numeric), 0, message)?;
                return Ok(());
            } else if let Ok(numeric_dec) = to_node.parse::<u32>() {
                self.send_text_packet(Some(numeric_dec), 0, message)?;
                return Ok(());
            }
            // If parsing fails, fall back to legacy path below.
        }

        let formatted_message = format!("TO:{} MSG:{}\n", to_node, message);

        #[cfg(feature = "serial")]
        {
            if let Some(ref mut port) = self.port {
                port.write_all(formatted_message.as_bytes())
                    .map_err(|e| anyhow!("Failed to write to serial port: {}", e))?;
                port.flush()
                    .map_err(|e| anyhow!("Failed to flush serial port: {}", e))?;

                debug!("(legacy) Sent to {}: {}", to_node, message);
            }
        }

        #[cfg(not(feature = "serial"))]
        {
            debug!("(legacy mock) send to {}: {}", to_node, message);
        }

        Ok(())
    }

    /// Parse a Meshtastic message into our format
    fn parse_meshtastic_message(&self, raw_message: &str) -> Option<String> {
        // This is a simplified parser for demonstration
        // Real implementation would parse actual Meshtastic protobuf messages

        let message = raw_message.trim();

        // Look for text message format: FROM:1234567890 MSG:Hello World
        if let Some(from_start) = message.find("FROM:") {
            if let Some(msg_start) = message.find("MSG:") {
                let from_end = message[from_start + 5..]
                    .find(' ')
                    .unwrap_or(message.len() - from_start - 5);
                let from_node = &message[from_start + 5..from_start + 5 + from_end];
                let msg_content = &message[msg_start + 4..];

                return Some(format!("{}:{}", from_node, msg_content));
            }
        }

        None
    }

    #[cfg(feature = "meshtastic-proto")]
    fn try_parse_protobuf_frame(&mut self, data: &[u8]) -> Option<String> {
        use prost::Message;
        use proto::from_radio::PayloadVariant as FRPayload;
        use proto::mesh_packet::PayloadVariant as MPPayload;
        use proto::{FromRadio, PortNum};
        let bytes = BytesMut::from(data);
        if let Ok(msg) = FromRadio::decode(&mut bytes.freeze()) {
            match msg.payload_variant.as_ref()? {
                FRPayload::ConfigCompleteId(id) => {
                    return Some(format!("CONFIG_COMPLETE:{id}"));
                }
                FRPayload::Packet(pkt) => {
                    if let Some(MPPayload::Decoded(data_msg)) = &pkt.payload_variant {
                        let port =
                            PortNum::try_from(data_msg.portnum).unwrap_or(PortNum::UnknownApp);
                        // Correlate explicit ACKs
                        if pkt.priority == 120 && data_msg.reply_id != 0 {
                            return Some(format!(
                                "ACK:id={} from=0x{:08x} to=0x{:08x} port={:?}",
                                data_msg.reply_id, pkt.from, pkt.to, port
                            ));
                        }
                        // Decode routing control messages and report errors tied to a specific id
                        if matches!(port, PortNum::RoutingApp) {
                            let mut b = BytesMut::from(&data_msg.payload[..]).freeze();
                            if let Ok(routing) = proto::Routing::decode(&mut b) {
                                use proto::routing::{Error as RErr, Variant as RVar};
                                if let Some(RVar::ErrorReason(e)) = routing.variant {
                                    if let Ok(err) = RErr::try_from(e) {
                                        let corr_id = if data_msg.request_id != 0 {
                                            data_msg.request_id
                                        } else {
                                            data_msg.reply_id
                                        };
                                        return Some(format!(
                                            "ROUTING_ERROR:{:?}:id={}",
                                            err, corr_id
                                        ));
                                    }
                                }
                            }
                        }
                        match port {
                            PortNum::TextMessageApp => {
                                if let Ok(text) = std::str::from_utf8(&data_msg.payload) {
                                    let dest = if pkt.to != 0 { Some(pkt.to) } else { None };
                                    // is_direct if destination equals our node id (when known) and not broadcast
                                    let is_direct = matches!((dest, self.our_node_id), (Some(d), Some(our)) if d == our);
                                    // In current Meshtastic proto, channel is a u32 field (0 = primary). Treat 0 as Some(0) for uniformity.
                                    let channel = Some(pkt.channel);
                                    self.text_events.push_back(TextEvent {
                                        source: pkt.from,
                                        dest,
                                        is_direct,
                                        channel,
                                        content: text.to_string(),
                                    });
                                    return Some(format!("TEXT:{}:{}", pkt.from, text));
                                }
                            }
                            PortNum::TextMessageCompressedApp => {
                                // Attempt naive decompression: if payload seems ASCII printable treat directly; else hex summarize.
                                let maybe_text = if data_msg
                                    .payload
                                    .iter()
                                    .all(|b| b.is_ascii() && !b.is_ascii_control())
                                {
                                    Some(String::from_utf8_lossy(&data_msg.payload).to_string())
                                } else {
                                    None
                                };
                                if let Some(text) = maybe_text {
                                    let dest = if pkt.to != 0 { Some(pkt.to) } else { None };
                                    let is_direct = matches!((dest, self.our_node_id), (Some(d), Some(our)) if d == our);
                                    let channel = Some(pkt.channel);
                                    self.text_events.push_back(TextEvent {
                                        source: pkt.from,
                                        dest,
                                        is_direct,
                                        channel,
                                        content: text.clone(),
                                    });
                                    return Some(format!("TEXT:{}:{}", pkt.from, text));
                                } else {
                                    let hex = data_msg
                                        .payload
                                        .iter()
                                        .map(|b| format!("{:02x}", b))
                                        .collect::<String>();
                                    return Some(format!("CTEXT:{}:{}", pkt.from, hex));
                                }
                            }
                            _ => {
                                if let Some(s) =
                                    summarize_known_port_payload(port, &data_msg.payload)
                                {
                                    return Some(format!("PKT:{}:port={:?}:{}", pkt.from, port, s));
                                } else {
                                    return Some(format!(
                                        "PKT:{}:port={:?}:len={} hex={}...",
                                        pkt.from,
                                        port,
                                        data_msg.payload.len(),
                                        hex_snippet(&data_msg.payload, 12)
                                    ));
                                }
                            }
                        }
                    }
                }
                FRPayload::MyInfo(info) => return Some(format!("MYINFO:{}", info.my_node_num)),
                FRPayload::NodeInfo(n) => {
                    if let Some(user) = &n.user {
                        return Some(format!(
                            "NODE:{}:{}:{}",
                            n.num, user.long_name, user.short_name
                        ));
                    } else {
                        return Some(format!("NODE:{}:", n.num));
                    }
                }
                FRPayload::Config(_) => return Some("CONFIG".to_string()),
                FRPayload::ModuleConfig(_) => return Some("MODULE_CONFIG".to_string()),
                FRPayload::FileInfo(_) => return Some("FILE_INFO".to_string()),
                FRPayload::QueueStatus(qs) => {
                    if qs.res != 0 {
                        return Some(format!(
                            "QUEUE_STATUS:res={} FREE={}/{} id={} (non-zero res)",
                            qs.res, qs.free, qs.maxlen, qs.mesh_packet_id
                        ));
                    } else {
                        return Some(format!(
                            "QUEUE_STATUS:res={} free={}/{} id={}",
                            qs.res, qs.free, qs.maxlen, qs.mesh_packet_id
                        ));
                    }
                }
                FRPayload::XmodemPacket(_) => return Some("XMODEM_PACKET".to_string()),
                FRPayload::Metadata(_) => return Some("METADATA".to_string()),
                FRPayload::MqttClientProxyMessage(_) => return Some("MQTT_PROXY".to_string()),
                _ => {}
            }
        }
        None
    }

    #[cfg(feature = "meshtastic-proto")]
    pub fn update_state_from_summary(&mut self, summary: &str) {
        if summary.starts_with("MYINFO:") {
            self.have_my_info = true;
        } else if summary.starts_with("NODE:") {
            let parts: Vec<&str> = summary.split(':').collect();
            if parts.len() >= 2 {
                if let Ok(id) = parts[1].parse::<u32>() {
                    let long_name = if parts.len() >= 3 {
                        parts[2].to_string()
                    } else {
                        String::new()
                    };
                    let network_short_name = if parts.len() >= 4 {
                        parts[3].to_string()
                    } else {
                        String::new()
                    };

                    // Prefer network short name if available and non-empty
                    let short_name = if !network_short_name.trim().is_empty() {
                        debug!(
                            "Using network short name '{}' for node {} ({})",
                            network_short_name.trim(),
                            id,
                            long_name
                        );
                        network_short_name.trim().to_string()
                    } else if !long_name.is_empty() {
                        // Generate short name from long name (first 4 chars or similar)
                        let generated =
                            long_name.chars().take(4).collect::<String>().to_uppercase();
                        debug!(
                            "Generated short name '{}' from long name '{}' for node {}",
                            generated, long_name, id
                        );
                        generated
                    } else {
                        format!("{:04X}", id & 0xFFFF)
                    };

                    let mut ni = proto::NodeInfo {
                        num: id,
                        ..Default::default()
                    };
                    if !long_name.is_empty() {
                        ni.user = Some(proto::User {
                            long_name: long_name.clone(),
                            short_name: short_name.clone(),
                            ..Default::default()
                        });
                    }
                    self.nodes.insert(id, ni);

                    // Emit node detection event for welcome system
                    if !long_name.is_empty() {
                        let _ = self.node_detection_tx.send(NodeDetectionEvent {
                            node_id: id,
                            long_name: long_name.clone(),
                            short_name: short_name.clone(),
                            is_from_startup_queue: false, // Real-time MYINFO detection
                        });
                    }

                    // Update cache
                    self.node_cache.update_node(id, long_name, short_name);
                    // Save cache asynchronously (best effort, don't block on failure)
                    if let Err(e) = self.save_node_cache() {
                        debug!("Failed to save node cache: {}", e);
                    }
                }
            }
        } else if summary == "CONFIG" {
            self.have_radio_config = true;
        } else if summary == "MODULE_CONFIG" {
            self.have_module_config = true;
        } else if summary.starts_with("CONFIG_COMPLETE:") {
            if let Some(id_str) = summary.split(':').nth(1) {
                if let Ok(id_val) = id_str.parse::<u32>() {
                    if self.config_request_id == Some(id_val) {
                        self.config_complete = true;
                    }
                }
            }
        }
        if summary.starts_with("MYINFO:") {
            if let Some(id_str) = summary.split(':').nth(1) {
                if let Ok(id_val) = id_str.parse::<u32>() {
                    self.our_node_id = Some(id_val);
                }
            }
        }
    }

    #[cfg(feature = "meshtastic-proto")]
    pub fn initial_sync_complete(&self) -> bool {
        self.config_complete && self.have_my_info && self.have_radio_config
    }
    /// Disconnect from the device
    pub async fn disconnect(&mut self) -> Result<()> {
        info!("Disconnecting from Meshtastic device");
        #[cfg(feature = "serial")]
        {
            self.port = None;
        }
        Ok(())
    }
}

#[cfg(feature = "meshtastic-proto")]
impl MeshtasticDevice {
    /// Retrieve next structured text event if available
    #[allow(dead_code)]
    pub fn next_text_event(&mut self) -> Option<TextEvent> {
        self.text_events.pop_front()
    }
    /// Build and send a text message MeshPacket via ToRadio (feature gated).
    /// to: Some(node_id) for direct, None for broadcast
    /// channel: channel index (0 primary)
    #[cfg(feature = "meshtastic-proto")]
    #[allow(dead_code)]
    pub fn send_text_packet(&mut self, to: Option<u32>, channel: u32, text: &str) -> Result<()> {
        use prost::Message;
        use proto::mesh_packet::PayloadVariant as MPPayload;
        use proto::to_radio::PayloadVariant as TRPayload;
        use proto::{Data, MeshPacket, PortNum, ToRadio};
        // Determine destination: broadcast if None
        let dest = to.unwrap_or(0xffffffff);
        // Populate Data payload
        let data_msg = Data {
            portnum: PortNum::TextMessageApp as i32,
            payload: text.as_bytes().to_vec().into(),
            want_response: false,
            dest: 0, // filled by firmware
            source: 0,
            request_id: 0,
            reply_id: 0,
            emoji: 0,
            bitfield: None,
        };
        let from_node = self.our_node_id.ok_or_else(||
            anyhow!(
                "Cannot send message: our_node_id not yet known (device may not have provided MYINFO)"
            )
        )?;

        // For direct messages (DMs), use reliable delivery to try to force immediate transmission
        let is_dm = to.is_some() && dest != 0xffffffff;
        let packet_id = if is_dm {
            // Generate unique ID for reliable packets (required for want_ack)
            use std::time::{SystemTime, UNIX_EPOCH};
            let since_epoch = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            (since_epoch.as_secs() as u32) ^ (since_epoch.subsec_nanos()) // Simple ID generation
        } else {
            0 // Broadcast packets don't need ID
        };

        let pkt = MeshPacket {
            from: from_node,
            to: dest,
            channel,
            payload_variant: Some(MPPayload::Decoded(data_msg)),
            id: packet_id,
            rx_time: 0,
            rx_snr: 0.0,
            hop_limit: 3,                         // Default hop limit for mesh routing
            want_ack: is_dm, // Request ACK for DMs to trigger immediate transmission
            priority: if is_dm { 70 } else { 0 }, // Use RELIABLE priority (70) for DMs, DEFAULT (0) for broadcasts
            ..Default::default()
        };

        let toradio = ToRadio {
            payload_variant: Some(TRPayload::Packet(pkt)),
        };
        // Encode and send using existing framing helper
        #[cfg(feature = "serial")]
        if let Some(ref mut port) = self.port {
            let mut payload = Vec::with_capacity(128);
            toradio.encode(&mut payload)?;
            let mut hdr = [0u8; 4];
            hdr[0] = 0x94;
            hdr[1] = 0xC3;
            hdr[2] = ((payload.len() >> 8) & 0xFF) as u8;
            hdr[3] = (payload.len() & 0xFF) as u8;
            port.write_all(&hdr)?;
            port.write_all(&payload)?;
            port.flush()?;

            // Add a small delay to allow the OS to flush the serial buffer.
            std::thread::sleep(std::time::Duration::from_millis(50));

            let display_text = if text.len() > 80 {
                truncate_for_log(text, 80)
            } else {
                escape_log(text)
            };
            let msg_type = if is_dm { "DM (reliable)" } else { "broadcast" };
            debug!(
                "Sent TextPacket ({}): from=0x{:08x} to=0x{:08x} channel={} id={} want_ack={} priority={} ({} bytes payload) text='{}'",
                msg_type,
                self.our_node_id.unwrap_or(0),
                dest,
                channel,
                packet_id,
                is_dm,
                if is_dm { 70 } else { 0 },
                payload.len(),
                display_text
            );
            if log::log_enabled!(log::Level::Trace) {
                let mut hex = String::with_capacity(payload.len() * 2);
                for b in &payload {
                    use std::fmt::Write;
                    let _ = write!(&mut hex, "{:02x}", b);
                }
                trace!("ToRadio payload hex:{}", hex);
            }
        }
        #[cfg(not(feature = "serial"))]
        {
            debug!(
                "(mock) Would send TextPacket to 0x{:08x}: '{}'",
                dest,
                escape_log(text)
            );
        }

        // For DMs, send a heartbeat immediately after to try to trigger radio transmission
        if is_dm {
            if let Err(e) = self.send_heartbeat() {
                warn!("Failed to send heartbeat after DM: {}", e);
            } else {
                trace!("Sent heartbeat after DM to trigger radio activity");
            }
        }

        Ok(())
    }
}

// (Public crate visibility no longer required; kept private above.)

#[cfg(feature = "meshtastic-proto")]
impl MeshtasticDevice {
    /// Send a ToRadio.WantConfigId request to trigger the node database/config push.
    pub fn send_want_config(&mut self, request_id: u32) -> Result<()> {
        use proto::to_radio::PayloadVariant;
        let msg = proto::ToRadio {
            payload_variant: Some(PayloadVariant::WantConfigId(request_id)),
        };
        #[cfg(feature = "meshtastic-proto")]
        {
            self.last_want_config_sent = Some(std::time::Instant::now());
        }
        self.send_toradio(msg)
    }

    /// Send a heartbeat frame (optional, can help keep link active)
    pub fn send_heartbeat(&mut self) -> Result<()> {
        use proto::to_radio::PayloadVariant;
        use proto::{Heartbeat, ToRadio};
        // nonce can be any incrementing value; for now just use a simple timestamp-based low bits
        let nonce = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis()
            & 0xffff) as u32;
        let hb = Heartbeat { nonce };
        let msg = ToRadio {
            payload_variant: Some(PayloadVariant::Heartbeat(hb)),
        };
        self.send_toradio(msg)
    }

    fn send_toradio(&mut self, msg: proto::ToRadio) -> Result<()> {
        use prost::Message;
        #[cfg(feature = "serial")]
        if let Some(ref mut port) = self.port {
            let mut payload = Vec::with_capacity(256);
            msg.encode(&mut payload)?;
            if payload.len() > u16::MAX as usize {
                return Err(anyhow!("payload too large"));
            }
            let mut hdr = [0u8; 4];
            hdr[0] = 0x94;
            hdr[1] = 0xC3;
            hdr[2] = ((payload.len() >> 8) & 0xFF) as u8;
            hdr[3] = (payload.len() & 0xFF) as u8;
            port.write_all(&hdr)?;
            port.write_all(&payload)?;
            port.flush()?;
            debug!("Sent ToRadio LEN frame ({} bytes payload)", payload.len());
        }
        Ok(())
    }
    /// Ensure a want_config request is active; resend occasionally until sync completes.
    #[cfg(feature = "meshtastic-proto")]
    pub fn ensure_want_config(&mut self) -> Result<()> {
        if self.config_request_id.is_none() {
            let mut id: u32 = rand::random();
            if id == 0 {
                id = 1;
            }
            self.config_request_id = Some(id);
            debug!("Generated config_request_id=0x{:08x}", id);
            self.send_want_config(id)?;
            return Ok(());
        }
        if self.initial_sync_complete() {
            return Ok(());
        }
        if let Some(last) = self.last_want_config_sent {
            if last.elapsed() > std::time::Duration::from_secs(7) {
                let id = self.config_request_id.unwrap();
                debug!("Resending want_config_id=0x{:08x}", id);
                self.send_want_config(id)?;
            }
        }
        Ok(())
    }
}

/// Create a shared serial port connection for both reader and writer
#[cfg(feature = "serial")]
async fn create_shared_serial_port(
    port_name: &str,
    baud_rate: u32,
) -> Result<Arc<Mutex<Box<dyn SerialPort>>>> {
    debug!(
        "Opening shared serial port {} at {} baud",
        port_name, baud_rate
    );

    let mut builder = serialport::new(port_name, baud_rate).timeout(Duration::from_millis(500));
    #[cfg(unix)]
    {
        builder = builder
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None);
    }
    let mut port = builder
        .open()
        .map_err(|e| anyhow!("Failed to open serial port {}: {}", port_name, e))?;

    // Toggle DTR/RTS to reset/ensure device wakes
    let _ = port.write_data_terminal_ready(true);
    let _ = port.write_request_to_send(true);
    sleep(Duration::from_millis(150)).await;

    // Clear any existing buffered startup text
    let mut purge_buf = [0u8; 512];
    if let Ok(available) = port.bytes_to_read() {
        if available > 0 {
            let _ = port.read(&mut purge_buf);
        }
    }

    debug!("Shared serial port initialized successfully");
    Ok(Arc::new(Mutex::new(port)))
}

#[cfg(feature = "meshtastic-proto")]
impl MeshtasticReader {
    /// Create a new reader task with shared port
    pub async fn new(
        shared_port: Arc<Mutex<Box<dyn SerialPort>>>,
        text_event_tx: mpsc::UnboundedSender<TextEvent>,
        node_detection_tx: mpsc::UnboundedSender<NodeDetectionEvent>,
        control_rx: mpsc::UnboundedReceiver<ControlMessage>,
        writer_control_tx: mpsc::UnboundedSender<ControlMessage>,
        node_id_tx: mpsc::UnboundedSender<u32>,
    ) -> Result<Self> {
        debug!("Initializing Meshtastic reader with shared port");

        Ok(MeshtasticReader {
            #[cfg(feature = "serial")]
            port: shared_port,
            slip: slip::SlipDecoder::new(),
            rx_buf: Vec::new(),
            text_event_tx,
            node_detection_tx,
            control_rx,
            writer_control_tx,
            node_id_tx,
            node_cache: NodeCache::new(),
            cache_file_path: "data/node_cache.json".to_string(),
            nodes: std::collections::HashMap::new(),
            our_node_id: None,
            binary_frames_seen: false,
        })
    }

    /// Create a mock reader for non-serial builds
    #[cfg(not(feature = "serial"))]
    pub async fn new_mock(
        text_event_tx: mpsc::UnboundedSender<TextEvent>,
        node_detection_tx: mpsc::UnboundedSender<NodeDetectionEvent>,
        control_rx: mpsc::UnboundedReceiver<ControlMessage>,
        writer_control_tx: mpsc::UnboundedSender<ControlMessage>,
        node_id_tx: mpsc::UnboundedSender<u32>,
    ) -> Result<Self> {
        info!("Initializing mock Meshtastic reader");

        Ok(MeshtasticReader {
            slip: slip::SlipDecoder::new(),
            rx_buf: Vec::new(),
            text_event_tx,
            node_detection_tx,
            control_rx,
            writer_control_tx,
            node_id_tx,
            node_cache: NodeCache::new(),
            cache_file_path: "data/node_cache.json".to_string(),
            nodes: std::collections::HashMap::new(),
            our_node_id: None,
            binary_frames_seen: false,
            node_detection_tx: node_detection_tx_param,
        })
    }

    /// Run the continuous reading task
    pub async fn run(mut self) -> Result<()> {
        info!("Starting Meshtastic reader task");

        // Load node cache
        if let Err(e) = self.load_node_cache() {
            warn!("Failed to load node cache: {}", e);
        }

        let mut interval = tokio::time::interval(Duration::from_millis(10));

        // Prune stale nodes every 10 minutes (nodes not seen in 24 hours)
        let mut prune_interval = tokio::time::interval(Duration::from_secs(600)); // 10 minutes
        prune_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                // Periodic node cache pruning
                _ = prune_interval.tick() => {
                    let removed = self.node_cache.remove_stale_nodes(1); // 1 day = 24 hours
                    if removed > 0 {
                        info!("Pruned {} stale nodes from cache (not seen in 24 hours)", removed);
                        if let Err(e) = self.save_node_cache() {
                            warn!("Failed to save node cache after pruning: {}", e);
                        }
                    }
                }

                // Check for control messages
                control_msg = self.control_rx.recv() => {
                    match control_msg {
                        Some(ControlMessage::Shutdown) => {
                            info!("Reader task received shutdown signal");
                            break;
                        }
                        Some(ControlMessage::DeviceStatus) => {
                            debug!("Reader: binary_frames_seen={}, our_node_id={:?}, node_count={}",
                                   self.binary_frames_seen, self.our_node_id, self.nodes.len());
                        }
                        Some(_) => {
                            // Other control messages not handled by reader
                        }
                        None => {
                            warn!("Control channel closed, shutting down reader");
                            break;
                        }
                    }
                }

                // Read from device
                _ = interval.tick() => {
                    if let Err(e) = self.read_and_process().await {
                        match e.downcast_ref::<std::io::Error>() {
                            Some(io_err) if io_err.kind() == std::io::ErrorKind::Interrupted => {
                                debug!("Reader interrupted (EINTR), likely shutdown in progress");
                                break;
                            }
                            _ => {
                                error!("Reader error: {} - continuing operation", e);
                                // Continue running despite errors for resilience
                                // Add a small delay to prevent tight error loops
                                sleep(Duration::from_millis(100)).await;
                            }
                        }
                    }
                }
            }
        }

        info!("Meshtastic reader task shutting down");
        Ok(())
    }

    async fn read_and_process(&mut self) -> Result<()> {
        #[cfg(feature = "serial")]
        {
            let mut buffer = [0; 1024];
            let read_result = {
                let mut port = self.port.lock().unwrap();
                port.read(&mut buffer)
            };

            match read_result {
                Ok(bytes_read) if bytes_read > 0 => {
                    let raw_slice = &buffer[..bytes_read];
                    trace!("RAW {} bytes: {}", bytes_read, hex_snippet(raw_slice, 64));

                    // Try length-prefixed framing first: 0x94 0xC3 len_hi len_lo
                    self.rx_buf.extend_from_slice(raw_slice);
                    self.process_framed_messages().await?;

                    // Try SLIP framing
                    let frames = self.slip.push(raw_slice);
                    if !frames.is_empty() {
                        self.binary_frames_seen = true;
                    }
                    for frame in frames {
                        trace!("SLIP frame {} bytes", frame.len());
                        self.process_protobuf_frame(&frame).await?;
                    }

                    // Fallback: treat as text for legacy compatibility
                    let message = String::from_utf8_lossy(raw_slice);
                    if let Some(parsed) = self.parse_legacy_text(&message) {
                        debug!("Legacy text message: {}", parsed);
                        // Convert to TextEvent if possible
                        if let Some(event) = self.text_to_event(&parsed) {
                            let _ = self.text_event_tx.send(event);
                        }
                    }
                }
                Ok(_) => {
                    // No data available, normal
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::TimedOut => {
                    // Timeout is normal
                }
                Err(e) => {
                    // Log the error but don't kill the reader task
                    warn!("Serial read error (continuing): {}", e);
                    // Small delay to prevent tight error loops
                    sleep(Duration::from_millis(50)).await;
                }
            }
        }

        #[cfg(not(feature = "serial"))]
        {
            // Mock implementation for testing
            sleep(Duration::from_millis(100)).await;
        }

        Ok(())
    }

    async fn process_framed_messages(&mut self) -> Result<()> {
        loop {
            if self.rx_buf.len() < 4 {
                break;
            }

            // Realign to header if needed
            if !(self.rx_buf[0] == 0x94 && self.rx_buf[1] == 0xC3) {
                if let Some(pos) = self.rx_buf.iter().position(|&b| b == 0x94) {
                    if pos > 0 {
                        self.rx_buf.drain(0..pos);
                    }
                } else {
                    self.rx_buf.clear();
                    break;
                }
                if self.rx_buf.len() < 4 {
                    break;
                }
                if !(self.rx_buf[0] == 0x94 && self.rx_buf[1] == 0xC3) {
                    continue;
                }
            }

            let declared = ((self.rx_buf[2] as usize) << 8) | (self.rx_buf[3] as usize);
            if declared == 0 || declared > 8192 {
                self.rx_buf.drain(0..1);
                continue;
            }
            if self.rx_buf.len() < 4 + declared {
                break;
            }

            let frame: Vec<u8> = self.rx_buf[4..4 + declared].to_vec();
            self.rx_buf.drain(0..4 + declared);

            self.binary_frames_seen = true;
            self.process_protobuf_frame(&frame).await?;
        }
        Ok(())
    }

    async fn process_protobuf_frame(&mut self, data: &[u8]) -> Result<()> {
        use prost::Message;
        use proto::from_radio::PayloadVariant as FRPayload;
        use proto::mesh_packet::PayloadVariant as MPPayload;
        use proto::{FromRadio, PortNum};

        let bytes = BytesMut::from(data);
        if let Ok(msg) = FromRadio::decode(&mut bytes.freeze()) {
            match msg.payload_variant.as_ref() {
                Some(FRPayload::ConfigCompleteId(_id)) => {
                    debug!("Received config_complete_id");
                }
                Some(FRPayload::Packet(pkt)) => {
                    if let Some(MPPayload::Decoded(data_msg)) = &pkt.payload_variant {
                        let port =
                            PortNum::try_from(data_msg.portnum).unwrap_or(PortNum::UnknownApp);

                        // Correlate explicit ACKs (priority=ACK and reply_id set)
                        if pkt.priority == 120 && data_msg.reply_id != 0 {
                            debug!(
                                "ACK received: id={} from=0x{:08x} to=0x{:08x} port={:?}",
                                data_msg.reply_id, pkt.from, pkt.to, port
                            );
                            let _ = self
                                .writer_control_tx
                                .send(ControlMessage::AckReceived(data_msg.reply_id));
                        }

                        // Decode routing control messages and report errors tied to a specific id
                        if matches!(port, PortNum::RoutingApp) {
                            let mut b = BytesMut::from(&data_msg.payload[..]).freeze();
                            if let Ok(routing) = proto::Routing::decode(&mut b) {
                                use proto::routing::{Error as RErr, Variant as RVar};
                                if let Some(RVar::ErrorReason(e)) = routing.variant {
                                    if let Ok(err) = RErr::try_from(e) {
                                        let corr_id = if data_msg.request_id != 0 {
                                            data_msg.request_id
                                        } else {
                                            data_msg.reply_id
                                        };
                                        match err {
                                            RErr::None => {
                                                // Treat OK as delivery confirmation for the correlated id
                                                debug!(
                                                    "Routing status OK for id={} from=0x{:08x} to=0x{:08x}",
                                                    corr_id, pkt.from, pkt.to
                                                );
                                                if corr_id != 0 {
                                                    let _ = self
                                                        .writer_control_tx
                                                        .send(ControlMessage::AckReceived(corr_id));
                                                }
                                            }
                                            _ => {
                                                warn!(
                                                    "Routing error for id={} from=0x{:08x} to=0x{:08x}: {:?}",
                                                    corr_id, pkt.from, pkt.to, err
                                                );
                                                let _ = self.writer_control_tx.send(
                                                    ControlMessage::RoutingError {
                                                        id: corr_id,
                                                        reason: e,
                                                    },
                                                );
                                            }
                                        }
                                    }
                                }
                            }
                        }
                        match port {
                            PortNum::PositionApp => {
                                // Position packets received (not used for ping anymore - we use TEXT_MESSAGE_APP with ACKs)
                                debug!("Received POSITION_APP packet from 0x{:08x}", pkt.from);
                            }
                            PortNum::NodeinfoApp => {
                                // Handle NODEINFO packets received over the mesh
                                use prost::Message;
                                let mut payload_buf = bytes::Bytes::from(data_msg.payload.to_vec());
                                if let Ok(user) = proto::User::decode(&mut payload_buf) {
                                    let long_name = user.long_name.trim().to_string();
                                    let short_name = user.short_name.trim().to_string();

                                    if !long_name.is_empty() || !short_name.is_empty() {
                                        // Update in-memory node map
                                        let node_info = proto::NodeInfo {
                                            num: pkt.from,
                                            user: Some(user),
                                            ..Default::default()
                                        };
                                        self.nodes.insert(pkt.from, node_info);

                                        // Emit node detection event for welcome system
                                        let _ = self.node_detection_tx.send(NodeDetectionEvent {
                                            node_id: pkt.from,
                                            long_name: long_name.clone(),
                                            short_name: short_name.clone(),
                                            is_from_startup_queue: false, // Real-time NODEINFO detection
                                        }); // Update persistent cache
                                        self.node_cache.update_node(
                                            pkt.from,
                                            long_name.clone(),
                                            short_name.clone(),
                                        );

                                        // Save cache (best effort)
                                        if let Err(e) = self.save_node_cache() {
                                            debug!("Failed to save node cache: {}", e);
                                        }

                                        debug!(
                                            "Updated node info for 0x{:08x}: {} ({})",
                                            pkt.from, long_name, short_name
                                        );
                                    }
                                }
                            }
                            PortNum::TextMessageApp => {
                                if let Ok(text) = std::str::from_utf8(&data_msg.payload) {
                                    let dest = if pkt.to != 0 { Some(pkt.to) } else { None };
                                    let is_direct = matches!((dest, self.our_node_id), (Some(d), Some(our)) if d == our);
                                    let channel = Some(pkt.channel);

                                    let event = TextEvent {
                                        source: pkt.from,
                                        dest,
                                        is_direct,
                                        channel,
                                        content: text.to_string(),
                                    };

                                    let _ = self.text_event_tx.send(event);
                                }
                            }
                            PortNum::TextMessageCompressedApp => {
                                // Handle compressed text messages
                                let maybe_text = if data_msg
                                    .payload
                                    .iter()
                                    .all(|b| b.is_ascii() && !b.is_ascii_control())
                                {
                                    Some(String::from_utf8_lossy(&data_msg.payload).to_string())
                                } else {
                                    None
                                };

                                if let Some(text) = maybe_text {
                                    let dest = if pkt.to != 0 { Some(pkt.to) } else { None };
                                    let is_direct = matches!((dest, self.our_node_id), (Some(d), Some(our)) if d == our);
                                    let channel = Some(pkt.channel);

                                    let event = TextEvent {
                                        source: pkt.from,
                                        dest,
                                        is_direct,
                                        channel,
                                        content: text,
                                    };

                                    let _ = self.text_event_tx.send(event);
                                }
                            }
                            _ => {
                                if let Some(summary) =
                                    summarize_known_port_payload(port, &data_msg.payload)
                                {
                                    debug!(
                                        "Non-text packet from {}: port={:?} {}",
                                        pkt.from, port, summary
                                    );
                                } else {
                                    debug!(
                                        "Non-text packet from {}: port={:?} len={} hex={}...",
                                        pkt.from,
                                        port,
                                        data_msg.payload.len(),
                                        hex_snippet(&data_msg.payload, 16)
                                    );
                                }
                            }
                        }
                    }
                }
                Some(FRPayload::MyInfo(info)) => {
                    // Only send node ID to writer if we don't already know it
                    if self.our_node_id.is_none() {
                        self.our_node_id = Some(info.my_node_num);
                        debug!("Got our node ID: {}", info.my_node_num);

                        // Notify the writer about our node ID (first time only)
                        if let Err(e) = self
                            .writer_control_tx
                            .send(ControlMessage::SetNodeId(info.my_node_num))
                        {
                            warn!("Failed to send node ID to writer: {}", e);
                        } else {
                            debug!("Sent node ID {} to writer", info.my_node_num);
                        }

                        // Also notify the server so ident messages can include the short ID
                        if let Err(e) = self.node_id_tx.send(info.my_node_num) {
                            debug!("Failed to send node ID to server: {}", e);
                        }
                    } else {
                        // We already know our node ID, no need to spam the writer
                        trace!("Received duplicate MyInfo, ignoring (node ID already known)");
                    }
                }
                Some(FRPayload::NodeInfo(n)) => {
                    if let Some(user) = &n.user {
                        let long_name = user.long_name.clone();
                        let short_name = user.short_name.clone();

                        self.nodes.insert(n.num, n.clone());

                        // Emit node detection event for welcome system
                        let _ = self.node_detection_tx.send(NodeDetectionEvent {
                            node_id: n.num,
                            long_name: long_name.clone(),
                            short_name: short_name.clone(),
                            is_from_startup_queue: false, // Config-based detection
                        });
                        self.node_cache.update_node(n.num, long_name, short_name);

                        // Save cache (best effort)
                        if let Err(e) = self.save_node_cache() {
                            debug!("Failed to save node cache: {}", e);
                        }

                        debug!(
                            "Updated node info for {}: {} ({})",
                            n.num, user.long_name, user.short_name
                        );
                    }
                }
                Some(FRPayload::Config(config)) => {
                    let config_type = match &config.payload_variant {
                        Some(proto::config::PayloadVariant::Device(_)) => "device",
                        Some(proto::config::PayloadVariant::Position(_)) => "position",
                        Some(proto::config::PayloadVariant::Power(_)) => "power",
                        Some(proto::config::PayloadVariant::Network(_)) => "network",
                        Some(proto::config::PayloadVariant::Display(_)) => "display",
                        Some(proto::config::PayloadVariant::Lora(_)) => "lora",
                        Some(proto::config::PayloadVariant::Bluetooth(_)) => "bluetooth",
                        Some(proto::config::PayloadVariant::Security(_)) => "security",
                        Some(proto::config::PayloadVariant::Sessionkey(_)) => "sessionkey",
                        Some(proto::config::PayloadVariant::DeviceUi(_)) => "device_ui",
                        None => "unknown",
                    };
                    debug!("Received config: {}", config_type);
                }
                Some(FRPayload::LogRecord(log)) => {
                    debug!("Received log_record: {}", log.message);
                }
                Some(FRPayload::Rebooted(_)) => {
                    debug!("Received rebooted");
                }
                Some(FRPayload::ModuleConfig(module_config)) => {
                    let module_type = match &module_config.payload_variant {
                        Some(proto::module_config::PayloadVariant::Mqtt(_)) => "mqtt",
                        Some(proto::module_config::PayloadVariant::Serial(_)) => "serial",
                        Some(proto::module_config::PayloadVariant::ExternalNotification(_)) => {
                            "external_notification"
                        }
                        Some(proto::module_config::PayloadVariant::StoreForward(_)) => {
                            "store_forward"
                        }
                        Some(proto::module_config::PayloadVariant::RangeTest(_)) => "range_test",
                        Some(proto::module_config::PayloadVariant::Telemetry(_)) => "telemetry",
                        Some(proto::module_config::PayloadVariant::CannedMessage(_)) => {
                            "canned_message"
                        }
                        Some(proto::module_config::PayloadVariant::Audio(_)) => "audio",
                        Some(proto::module_config::PayloadVariant::RemoteHardware(_)) => {
                            "remote_hardware"
                        }
                        Some(proto::module_config::PayloadVariant::NeighborInfo(_)) => {
                            "neighbor_info"
                        }
                        Some(proto::module_config::PayloadVariant::AmbientLighting(_)) => {
                            "ambient_lighting"
                        }
                        Some(proto::module_config::PayloadVariant::DetectionSensor(_)) => {
                            "detection_sensor"
                        }
                        Some(proto::module_config::PayloadVariant::Paxcounter(_)) => "paxcounter",
                        None => "unknown",
                    };
                    debug!("Received moduleConfig: {}", module_type);
                }
                Some(FRPayload::Channel(channel)) => {
                    let channel_name = channel
                        .settings
                        .as_ref()
                        .map(|s| {
                            if s.name.is_empty() {
                                "Default".to_string()
                            } else {
                                s.name.clone()
                            }
                        })
                        .unwrap_or_else(|| "Disabled".to_string());
                    debug!(
                        "Received channel: index={} name='{}'",
                        channel.index, channel_name
                    );
                }
                Some(FRPayload::FileInfo(file_info)) => {
                    debug!(
                        "Received fileInfo: '{}' ({} bytes)",
                        file_info.file_name, file_info.size_bytes
                    );
                }
                Some(FRPayload::QueueStatus(qs)) => {
                    // res is an error/status code; free/maxlen reflect outgoing queue capacity
                    // mesh_packet_id links to a specific send attempt (0 when not applicable)
                    if qs.res != 0 {
                        debug!(
                            "Received queueStatus: res={} FREE={}/{} id={} (non-zero res)",
                            qs.res, qs.free, qs.maxlen, qs.mesh_packet_id
                        );
                    } else {
                        debug!(
                            "Received queueStatus: res={} free={}/{} mesh_packet_id={}",
                            qs.res, qs.free, qs.maxlen, qs.mesh_packet_id
                        );
                    }
                }
                Some(FRPayload::XmodemPacket(_)) => {
                    debug!("Received xmodemPacket");
                }
                Some(FRPayload::Metadata(_)) => {
                    debug!("Received metadata");
                }
                Some(FRPayload::MqttClientProxyMessage(_)) => {
                    debug!("Received mqttClientProxyMessage");
                }
                Some(FRPayload::ClientNotification(_)) => {
                    debug!("Received clientNotification");
                }
                Some(FRPayload::DeviceuiConfig(_)) => {
                    debug!("Received deviceuiConfig");
                }
                None => {
                    debug!("FromRadio message with no payload");
                }
            }
        }
        Ok(())
    }

    fn parse_legacy_text(&self, message: &str) -> Option<String> {
        let message = message.trim();

        // Look for text message format: FROM:1234567890 MSG:Hello World
        if let Some(from_start) = message.find("FROM:") {
            if let Some(msg_start) = message.find("MSG:") {
                let from_end = message[from_start + 5..]
                    .find(' ')
                    .unwrap_or(message.len() - from_start - 5);
                let from_node = &message[from_start + 5..from_start + 5 + from_end];
                let msg_content = &message[msg_start + 4..];

                return Some(format!("{}:{}", from_node, msg_content));
            }
        }

        None
    }

    fn text_to_event(&self, text: &str) -> Option<TextEvent> {
        // Parse legacy text format into TextEvent
        if let Some(colon_pos) = text.find(':') {
            let (from_str, content) = text.split_at(colon_pos);
            let content = &content[1..]; // Remove the colon

            if let Ok(source) = from_str.parse::<u32>() {
                return Some(TextEvent {
                    source,
                    dest: None,       // Legacy messages don't have explicit dest
                    is_direct: false, // Assume public for legacy
                    channel: Some(0), // Assume primary channel
                    content: content.to_string(),
                });
            }
        }
        None
    }

    fn load_node_cache(&mut self) -> Result<()> {
        if std::path::Path::new(&self.cache_file_path).exists() {
            match NodeCache::load_from_file(&self.cache_file_path) {
                Ok(cache) => {
                    debug!(
                        "Loaded {} cached nodes from {}",
                        cache.nodes.len(),
                        self.cache_file_path
                    );
                    // Merge cached nodes into runtime nodes
                    for (node_id, cached_node) in &cache.nodes {
                        if !self.nodes.contains_key(node_id) {
                            let mut node_info = proto::NodeInfo {
                                num: *node_id,
                                ..Default::default()
                            };
                            node_info.user = Some(proto::User {
                                long_name: cached_node.long_name.clone(),
                                short_name: cached_node.short_name.clone(),
                                ..Default::default()
                            });
                            self.nodes.insert(*node_id, node_info);
                        }
                    }
                    self.node_cache = cache;
                    Ok(())
                }
                Err(e) => {
                    warn!("Failed to load node cache: {}", e);
                    Ok(()) // Continue without cache
                }
            }
        } else {
            debug!(
                "No node cache file found at {}, starting fresh",
                self.cache_file_path
            );
            Ok(())
        }
    }

    fn save_node_cache(&self) -> Result<()> {
        // Ensure directory exists
        if let Some(parent) = std::path::Path::new(&self.cache_file_path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        self.node_cache.save_to_file(&self.cache_file_path)
    }
}

#[cfg(feature = "meshtastic-proto")]
impl MeshtasticWriter {
    /// Create a new writer task with shared port
    pub async fn new(
        shared_port: Arc<Mutex<Box<dyn SerialPort>>>,
        outgoing_rx: mpsc::UnboundedReceiver<OutgoingMessage>,
        control_rx: mpsc::UnboundedReceiver<ControlMessage>,
        tuning: WriterTuning,
    ) -> Result<Self> {
        debug!("Initializing Meshtastic writer with shared port");

        Ok(MeshtasticWriter {
            #[cfg(feature = "serial")]
            port: shared_port,
            outgoing_rx,
            control_rx,
            our_node_id: None,
            config_request_id: None,
            last_want_config_sent: None,
            pending: std::collections::HashMap::new(),
            pending_broadcast: std::collections::HashMap::new(),
            pending_pings: std::collections::HashMap::new(),
            last_high_priority_sent: None,
            last_text_send: None,
            tuning,
            scheduler: None,
        })
    }

    /// Create a mock writer for non-serial builds
    #[cfg(not(feature = "serial"))]
    pub async fn new_mock(
        outgoing_rx: mpsc::UnboundedReceiver<OutgoingMessage>,
        control_rx: mpsc::UnboundedReceiver<ControlMessage>,
        tuning: WriterTuning,
    ) -> Result<Self> {
        debug!("Initializing mock Meshtastic writer");

        Ok(MeshtasticWriter {
            outgoing_rx,
            control_rx,
            our_node_id: None,
            config_request_id: None,
            last_want_config_sent: None,
            pending: std::collections::HashMap::new(),
            pending_broadcast: std::collections::HashMap::new(),
            pending_pings: std::collections::HashMap::new(),
            last_high_priority_sent: None,
            last_text_send: None,
            tuning,
            scheduler: None,
        })
    }

    /// Send a ping packet to a node
    #[cfg(feature = "serial")]
    fn send_ping_packet(&mut self, to: u32, channel: u32, _payload: &str) -> Result<u32> {
        use prost::Message;
        use proto::mesh_packet::PayloadVariant as MPPayload;
        use proto::to_radio::PayloadVariant as TRPayload;
        use proto::{Data, MeshPacket, PortNum, ToRadio};

        // Use TEXT_MESSAGE_APP with single "." character
        // This leverages routing ACK system - much more reliable than position requests
        let data_msg = Data {
            portnum: PortNum::TextMessageApp as i32,
            payload: ".".as_bytes().to_vec().into(), // Minimal non-intrusive payload
            want_response: false,
            dest: 0,
            source: 0,
            request_id: 0,
            reply_id: 0,
            emoji: 0,
            bitfield: None,
        };

        let from_node = self
            .our_node_id
            .ok_or_else(|| anyhow!("Cannot send ping: our_node_id not yet known"))?;

        // Generate unique packet ID
        use std::time::{SystemTime, UNIX_EPOCH};
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let packet_id = (since_epoch.as_secs() as u32) ^ (since_epoch.subsec_nanos());

        let pkt = MeshPacket {
            from: from_node,
            to,
            channel,
            payload_variant: Some(MPPayload::Decoded(data_msg)),
            id: packet_id,
            rx_time: 0,
            rx_snr: 0.0,
            hop_limit: 3,
            want_ack: true, // Critical: request routing ACK to confirm delivery
            priority: 10,   // Use ACK priority for faster delivery
            ..Default::default()
        };

        let toradio = ToRadio {
            payload_variant: Some(TRPayload::Packet(pkt)),
        };

        let mut guard = self.port.lock().unwrap();
        let mut payload_bytes = Vec::with_capacity(128);
        toradio.encode(&mut payload_bytes)?;
        let mut hdr = [0u8; 4];
        hdr[0] = 0x94;
        hdr[1] = 0xC3;
        hdr[2] = ((payload_bytes.len() >> 8) & 0xFF) as u8;
        hdr[3] = (payload_bytes.len() & 0xFF) as u8;
        guard.write_all(&hdr)?;
        guard.write_all(&payload_bytes)?;
        guard.flush()?;
        drop(guard);

        std::thread::sleep(std::time::Duration::from_millis(50));

        debug!(
            "Sent TEXT_MESSAGE_APP ping: to=0x{:08x} channel={} id=0x{:08x}",
            to, channel, packet_id
        );

        Ok(packet_id)
    }

    #[cfg(not(feature = "serial"))]
    fn send_ping_packet(&mut self, to: u32, _channel: u32, _payload: &str) -> Result<u32> {
        debug!("(mock) Would send ping to 0x{:08x}", to);
        Ok(rand::random())
    }

    /// Run the writer task
    pub async fn run(mut self) -> Result<()> {
        info!("Starting Meshtastic writer task");

        // Send a single WantConfigId at startup to fetch node db and config
        if self.config_request_id.is_none() {
            let mut id: u32 = rand::random();
            if id == 0 {
                id = 1;
            }
            self.config_request_id = Some(id);
            info!(
                "Requesting initial config from radio (want_config_id=0x{:08x})",
                id
            );
            if let Err(e) = self.send_want_config(id) {
                warn!("Initial config request failed: {}", e);
            }
        }

        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(30));

        loop {
            tokio::select! {
                // Handle outgoing messages
                msg = self.outgoing_rx.recv() => {
                    match msg {
                        Some(outgoing) => {
                            match outgoing.kind.clone() {
                                OutgoingKind::Normal => {
                                    if let Err(e) = self.send_message(&outgoing).await { error!("Failed to send message: {}", e); }
                                }
                                OutgoingKind::Retry { id } => {
                                    // Only act if still pending and due
                                    if let Some(ready) = self.pending.get(&id).cloned() {
                                        let now = std::time::Instant::now();
                                        if now >= ready.next_due {
                                            const MAX_ATTEMPTS: u8 = 3;
                                            if ready.attempts >= MAX_ATTEMPTS {
                                                let expired = self.pending.remove(&id).unwrap();
                                                metrics::inc_reliable_failed();
                                                warn!("Failed id={} to=0x{:08x} ({}): max attempts reached (scheduler retry)", id, expired.to, expired.content_preview);
                                            } else {
                                                // perform resend
                                                let full = ready.full_content.clone();
                                                let to = ready.to; let channel = ready.channel;
                                                if let Err(e) = self.resend_text_packet(id, to, channel, &full).await {
                                                    warn!("Resend failed id={} to=0x{:08x}: {}", id, to, e);
                                                } else {
                                                    // Advance backoff index and schedule next retry if still under attempt limit
                                                    let backoffs = &self.tuning.dm_resend_backoff_seconds;
                                                    if let Some(pmut) = self.pending.get_mut(&id) {
                                                        let max_idx = (backoffs.len().saturating_sub(1)) as u8;
                                                        pmut.attempts += 1; // increment after successful resend
                                                        if pmut.backoff_idx < max_idx { pmut.backoff_idx += 1; }
                                                        let next_delay = std::time::Duration::from_secs(backoffs[pmut.backoff_idx as usize]);
                                                        pmut.next_due = std::time::Instant::now() + next_delay;
                                                        metrics::inc_reliable_retries();
                                                        debug!("Resent id={} to=0x{:08x} (attempt {})", id, to, pmut.attempts);
                                                        // Enqueue next retry if we haven't exhausted attempts
                                                        if pmut.attempts < MAX_ATTEMPTS {
                                                            if let Some(sched) = &self.scheduler {
                                                                use crate::bbs::dispatch::{MessageEnvelope, MessageCategory, Priority};
                                                                let retry_env = MessageEnvelope::new(
                                                                    MessageCategory::Retry,
                                                                    Priority::High,
                                                                    next_delay,
                                                                    OutgoingMessage { to_node: Some(to), channel, content: String::new(), priority: MessagePriority::High, kind: OutgoingKind::Retry { id }, request_ack: false }
                                                                );
                                                                sched.enqueue(retry_env);
                                                            }
                                                        }
                                                    }
                                                }
                                            }
                                        } else {
                                            // Not yet due; re-enqueue adjusted delay
                                            if let Some(sched) = &self.scheduler {
                                                use crate::bbs::dispatch::{MessageEnvelope, MessageCategory, Priority};
                                                let remaining = ready.next_due.saturating_duration_since(now);
                                                let retry_env = MessageEnvelope::new(
                                                    MessageCategory::Retry,
                                                    Priority::High,
                                                    remaining,
                                                    OutgoingMessage { to_node: Some(ready.to), channel: ready.channel, content: String::new(), priority: MessagePriority::High, kind: OutgoingKind::Retry { id }, request_ack: false }
                                                );
                                                sched.enqueue(retry_env);
                                            }
                                        }
                                    } else {
                                        debug!("Retry envelope for id={} ignored (no longer pending)", id);
                                    }
                                }
                            }
                        }
                        None => {
                            warn!("Outgoing message channel closed, shutting down writer");
                            break;
                        }
                    }
                }

                // Handle control messages
                control_msg = self.control_rx.recv() => {
                    match control_msg {
                        Some(ControlMessage::Shutdown) => {
                            info!("Writer task received shutdown signal");
                            break;
                        }
                        Some(ControlMessage::AckReceived(id)) => {
                            // Check pending_pings first (for TEXT_MESSAGE_APP ping confirmations)
                            if let Some((target_node, response_tx)) = self.pending_pings.remove(&id) {
                                debug!("Ping ACK received from node 0x{:08x} (packet id=0x{:08x})", target_node, id);
                                let _ = response_tx.send(true);
                            } else if let Some(p) = self.pending.remove(&id) {
                                metrics::observe_ack_latency(p.sent_at);
                                metrics::inc_reliable_acked();
                                debug!("Delivered id={} to=0x{:08x} ({}), attempts={} latency_ms={}", id, p.to, p.content_preview, p.attempts, p.sent_at.elapsed().as_millis());
                            } else if let Some(bp) = self.pending_broadcast.remove(&id) {
                                metrics::inc_broadcast_ack_confirmed();
                                debug!(
                                    "Broadcast confirmed by at least one ack: id={} channel={} preview='{}'",
                                    id, bp.channel, escape_log(&bp.preview)
                                );
                            } else {
                                debug!("Delivered id={} (no pending entry)", id);
                            }
                        }
                        Some(ControlMessage::RoutingError { id, reason }) => {
                            // Map reason to enum when possible to decide if transient
                            #[allow(unused_imports)]
                            use crate::protobuf::meshtastic_generated as proto;
                            let transient = matches!(
                                proto::routing::Error::try_from(reason),
                                Ok(proto::routing::Error::RateLimitExceeded)
                                    | Ok(proto::routing::Error::DutyCycleLimit)
                                    | Ok(proto::routing::Error::Timeout)
                            );
                            if transient {
                                if let Some(p) = self.pending.get_mut(&id) {
                                    // Keep current backoff stage; just ensure next_due is at least the stage delay from now
                                    let backoffs = &self.tuning.dm_resend_backoff_seconds;
                                    let stage = backoffs.get(p.backoff_idx as usize)
                                        .copied()
                                        .unwrap_or_else(|| *backoffs.last().unwrap_or(&16));
                                    let delay = std::time::Duration::from_secs(stage);
                                    let min_due = std::time::Instant::now() + delay;
                                    if p.next_due < min_due { p.next_due = min_due; }
                                    warn!(
                                        "Transient routing error (reason={}) for id={} to=0x{:08x} ({}); will retry in {}s (stage {})",
                                        reason, id, p.to, p.content_preview, stage, p.backoff_idx
                                    );
                                    metrics::inc_reliable_retries();
                                } else {
                                    warn!("Transient routing error for id={} (no pending entry): reason={}", id, reason);
                                }
                            } else {
                                // Map to symbolic name if possible for clearer diagnostics
                                let reason_name = match proto::routing::Error::try_from(reason) {
                                    Ok(v) => format!("{:?}", v),
                                    Err(_) => "Unknown".to_string(),
                                };
                                if let Some(p) = self.pending.remove(&id) {
                                    metrics::inc_reliable_failed();
                                    warn!("Failed id={} to=0x{:08x} ({}): reason={} ({})", id, p.to, p.content_preview, reason, reason_name);
                                } else if let Some((target_node, response_tx)) = self.pending_pings.remove(&id) {
                                    debug!("Ping failed for node 0x{:08x} (packet id=0x{:08x}): reason={} ({})", target_node, id, reason, reason_name);
                                    let _ = response_tx.send(false); // Notify failure
                                } else {
                                    warn!("Failed id={} (routing error, no pending entry): reason={} ({})", id, reason, reason_name);
                                }
                            }
                        }
                        Some(ControlMessage::ConfigRequest(id)) => {
                            self.config_request_id = Some(id);
                            if let Err(e) = self.send_want_config(id) {
                                error!("Failed to send config request: {}", e);
                            }
                        }
                        Some(ControlMessage::Heartbeat) => {
                            if let Err(e) = self.send_heartbeat() {
                                error!("Failed to send heartbeat: {}", e);
                            }
                        }
                        Some(ControlMessage::SetNodeId(node_id)) => {
                            self.our_node_id = Some(node_id);
                            debug!("Writer: received node ID {}", node_id);
                        }
                        Some(ControlMessage::SendPing { to, channel, response_tx }) => {
                            debug!("Writer received SendPing for 0x{:08x}", to);
                            match self.send_ping_packet(to, channel, "") {
                                Ok(packet_id) => {
                                    debug!("Ping sent to 0x{:08x}, tracking packet_id 0x{:08x}", to, packet_id);
                                    self.pending_pings.insert(packet_id, (to, response_tx));
                                }
                                Err(e) => {
                                    warn!("Failed to send ping to 0x{:08x}: {}", to, e);
                                    let _ = response_tx.send(false); // Notify failure
                                }
                            }
                        }
                        Some(ControlMessage::SetSchedulerHandle(handle)) => {
                            self.scheduler = Some(handle);
                            debug!("Writer: scheduler handle attached for retry scheduling");
                        }
                        Some(_) => {
                            // Other control messages
                        }
                        None => {
                            warn!("Control channel closed, shutting down writer");
                            break;
                        }
                    }
                }

                // Periodic heartbeat
                _ = heartbeat_interval.tick() => {
                    // periodic heartbeat
                    if let Err(e) = self.send_heartbeat() { debug!("Heartbeat send error: {:?}", e); }
                    // expire stale broadcast ack trackers
                    let now = std::time::Instant::now();
                    let expired: Vec<u32> = self.pending_broadcast.iter()
                        .filter_map(|(id, bp)| if bp.expires_at <= now { Some(*id) } else { None })
                        .collect();
                    for id in expired {
                        if let Some(bp) = self.pending_broadcast.remove(&id) {
                            metrics::inc_broadcast_ack_expired();
                            // If this looks like an IDENT beacon, surface at INFO per airtime policy.
                            // We intentionally do not retry broadcasts; the radio may have already retried at the link layer.
                            let is_ident = bp.preview.trim_start().starts_with("[IDENT]");
                            if is_ident {
                                info!(
                                    "Ident broadcast id={} had no ACK within TTL (channel={}, preview='{}'); not retrying",
                                    id, bp.channel, escape_log(&bp.preview)
                                );
                            } else {
                                debug!(
                                    "Broadcast id={} expired without ack (channel={}, preview='{}')",
                                    id, bp.channel, escape_log(&bp.preview)
                                );
                            }
                        }
                    }
                }

            }
        }

        info!("Meshtastic writer task shutting down");
        Ok(())
    }

    async fn send_message(&mut self, msg: &OutgoingMessage) -> Result<()> {
        // Enforce a minimum gap between text packet transmissions across the queue
        let min_gap = std::cmp::max(self.tuning.min_send_gap_ms, 2000);
        self.enforce_min_send_gap(Duration::from_millis(min_gap))
            .await;
        use prost::Message;
        use proto::mesh_packet::PayloadVariant as MPPayload;
        use proto::to_radio::PayloadVariant as TRPayload;
        use proto::{Data, MeshPacket, PortNum, ToRadio};

        let dest = msg.to_node.unwrap_or(0xffffffff);

        let data_msg = Data {
            portnum: PortNum::TextMessageApp as i32,
            payload: msg.content.as_bytes().to_vec().into(),
            want_response: false,
            dest: 0,
            source: 0,
            request_id: 0,
            reply_id: 0,
            emoji: 0,
            bitfield: None,
        };

        let from_node = self
            .our_node_id
            .ok_or_else(|| anyhow!("Cannot send message: our_node_id not yet known"))?;

        let is_dm = msg.to_node.is_some() && dest != 0xffffffff;
        let wants_ack_broadcast = !is_dm && dest == 0xffffffff && msg.request_ack;
        let packet_id = if is_dm || wants_ack_broadcast {
            use std::time::{SystemTime, UNIX_EPOCH};
            let since_epoch = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            (since_epoch.as_secs() as u32) ^ (since_epoch.subsec_nanos())
        } else {
            0
        };

        let priority = match msg.priority {
            MessagePriority::High => 70,
            MessagePriority::Normal => 0,
        };

        // Pacing to reduce airtime fairness rate limiting
        // - If a reliable DM was just sent, delay a normal-priority broadcast slightly
        // - If another reliable DM is queued immediately after one, insert a small gap
        if let Some(last_hi) = self.last_high_priority_sent {
            let elapsed = last_hi.elapsed();
            if priority == 0 {
                // Normal broadcast shortly after a reliable DM: configurable delay
                let target_gap =
                    std::time::Duration::from_millis(self.tuning.post_dm_broadcast_gap_ms);
                if elapsed < target_gap {
                    let wait = target_gap - elapsed;
                    debug!(
                        "Pacing: delaying broadcast by {}ms after recent reliable DM",
                        wait.as_millis()
                    );
                    sleep(wait).await;
                }
            } else if priority == 70 {
                // Back-to-back reliable DMs: configurable gap
                let target_gap = std::time::Duration::from_millis(self.tuning.dm_to_dm_gap_ms);
                if elapsed < target_gap {
                    let wait = target_gap - elapsed;
                    debug!(
                        "Pacing: delaying reliable DM by {}ms to avoid rate limit",
                        wait.as_millis()
                    );
                    sleep(wait).await;
                }
            }
        }

        let pkt = MeshPacket {
            from: from_node,
            to: dest,
            channel: msg.channel,
            payload_variant: Some(MPPayload::Decoded(data_msg)),
            id: packet_id,
            rx_time: 0,
            rx_snr: 0.0,
            hop_limit: 3,
            want_ack: is_dm || wants_ack_broadcast,
            priority,
            ..Default::default()
        };

        let toradio = ToRadio {
            payload_variant: Some(TRPayload::Packet(pkt)),
        };

        #[cfg(feature = "serial")]
        {
            let mut payload = Vec::with_capacity(128);
            toradio.encode(&mut payload)?;
            let mut hdr = [0u8; 4];
            hdr[0] = 0x94;
            hdr[1] = 0xC3;
            hdr[2] = ((payload.len() >> 8) & 0xFF) as u8;
            hdr[3] = (payload.len() & 0xFF) as u8;

            {
                let mut port = self.port.lock().unwrap();
                port.write_all(&hdr)?;
                port.write_all(&payload)?;
                port.flush()?;
            }

            // Small delay to allow OS to flush the serial buffer
            sleep(Duration::from_millis(50)).await;
            // Record the time of this text packet send for gating
            self.last_text_send = Some(std::time::Instant::now());

            let display_text = if msg.content.len() > 80 {
                truncate_for_log(&msg.content, 80)
            } else {
                escape_log(&msg.content)
            };

            let msg_type = if is_dm {
                "DM (reliable)"
            } else if wants_ack_broadcast {
                "broadcast (want_ack)"
            } else {
                "broadcast"
            };
            debug!(
                "Sent TextPacket ({}): to=0x{:08x} channel={} id={} want_ack={} priority={} ({} bytes) text='{}'",
                msg_type,
                dest,
                msg.channel,
                packet_id,
                is_dm || wants_ack_broadcast,
                priority,
                payload.len(),
                display_text
            );

            // For DMs, record pending and proactively send a heartbeat to nudge immediate radio TX
            if is_dm {
                // capture a small preview for logging
                let preview = if msg.content.len() > 40 {
                    truncate_for_log(&msg.content, 40)
                } else {
                    escape_log(&msg.content)
                };
                let now = std::time::Instant::now();
                self.pending.insert(
                    packet_id,
                    PendingSend {
                        to: dest,
                        channel: msg.channel,
                        full_content: msg.content.clone(),
                        content_preview: preview,
                        attempts: 1,
                        // First retry scheduled after the first configured backoff stage
                        next_due: now
                            + std::time::Duration::from_secs(
                                *self.tuning.dm_resend_backoff_seconds.first().unwrap_or(&4),
                            ),
                        backoff_idx: 0,
                        sent_at: now,
                    },
                );
                metrics::inc_reliable_sent();
                // Schedule first retry envelope via central scheduler (Retry category) if handle attached
                if let Some(sched) = &self.scheduler {
                    use crate::bbs::dispatch::{MessageCategory, MessageEnvelope, Priority};
                    let delay = std::time::Duration::from_secs(
                        *self.tuning.dm_resend_backoff_seconds.first().unwrap_or(&4),
                    );
                    let retry_env = MessageEnvelope::new(
                        MessageCategory::Retry,
                        Priority::High, // treat retries as high to avoid starvation (can revisit fairness)
                        delay,
                        OutgoingMessage {
                            to_node: Some(dest),
                            channel: msg.channel,
                            content: String::new(), // content not needed (will lookup pending)
                            priority: MessagePriority::High,
                            kind: OutgoingKind::Retry { id: packet_id },
                            request_ack: false,
                        },
                    );
                    sched.enqueue(retry_env);
                }
                if let Err(e) = self.send_heartbeat() {
                    warn!("Failed to send heartbeat after DM: {}", e);
                } else {
                    trace!("Sent heartbeat after DM to trigger radio activity");
                }
                // Update pacing marker for high-priority
                self.last_high_priority_sent = Some(std::time::Instant::now());
            } else if wants_ack_broadcast {
                // Track this broadcast awaiting at-least-one ack; no retries, short TTL
                let preview = if msg.content.len() > 40 {
                    truncate_for_log(&msg.content, 40)
                } else {
                    escape_log(&msg.content)
                };
                let ttl = std::time::Duration::from_secs(10);
                self.pending_broadcast.insert(
                    packet_id,
                    BroadcastPending {
                        channel: msg.channel,
                        preview,
                        expires_at: std::time::Instant::now() + ttl,
                    },
                );
            } else if priority == 0 {
                // For broadcasts without ack request, do not update high-priority marker
            }
        }

        #[cfg(not(feature = "serial"))]
        {
            debug!(
                "(mock) Would send TextPacket to 0x{:08x}: '{}'",
                dest, msg.content
            );
        }

        Ok(())
    }

    /// Re-send a previously attempted reliable text packet with the same id
    #[cfg(feature = "meshtastic-proto")]
    async fn resend_text_packet(
        &mut self,
        packet_id: u32,
        dest: u32,
        channel: u32,
        content: &str,
    ) -> Result<()> {
        use prost::Message;
        use proto::mesh_packet::PayloadVariant as MPPayload;
        use proto::to_radio::PayloadVariant as TRPayload;
        use proto::{Data, MeshPacket, PortNum, ToRadio};

        let from_node = self
            .our_node_id
            .ok_or_else(|| anyhow!("Cannot resend: our_node_id not yet known"))?;

        let data_msg = Data {
            portnum: PortNum::TextMessageApp as i32,
            payload: content.as_bytes().to_vec().into(),
            want_response: false,
            dest: 0,
            source: 0,
            request_id: 0,
            reply_id: 0,
            emoji: 0,
            bitfield: None,
        };
        let pkt = MeshPacket {
            from: from_node,
            to: dest,
            channel,
            payload_variant: Some(MPPayload::Decoded(data_msg)),
            id: packet_id,
            rx_time: 0,
            rx_snr: 0.0,
            hop_limit: 3,
            want_ack: true,
            priority: 70,
            ..Default::default()
        };
        let toradio = ToRadio {
            payload_variant: Some(TRPayload::Packet(pkt)),
        };

        #[cfg(feature = "serial")]
        {
            // Enforce minimum gap between text packet transmissions
            let min_gap = std::cmp::max(self.tuning.min_send_gap_ms, 2000);
            self.enforce_min_send_gap(Duration::from_millis(min_gap))
                .await;
            let mut payload = Vec::with_capacity(128);
            toradio.encode(&mut payload)?;
            let mut hdr = [0u8; 4];
            hdr[0] = 0x94;
            hdr[1] = 0xC3;
            hdr[2] = ((payload.len() >> 8) & 0xFF) as u8;
            hdr[3] = (payload.len() & 0xFF) as u8;
            let mut port = self.port.lock().unwrap();
            port.write_all(&hdr)?;
            port.write_all(&payload)?;
            port.flush()?;
            debug!(
                "Re-sent TextPacket DM: to=0x{:08x} channel={} id={} priority=70 ({} bytes)",
                dest,
                channel,
                packet_id,
                payload.len()
            );
            self.last_text_send = Some(std::time::Instant::now());
        }
        Ok(())
    }

    /// Ensure at least `min_gap` has elapsed since the last text packet send
    async fn enforce_min_send_gap(&mut self, min_gap: Duration) {
        if let Some(last) = self.last_text_send {
            let elapsed = last.elapsed();
            if elapsed < min_gap {
                let wait = min_gap - elapsed;
                debug!(
                    "Gating: waiting {}ms to respect minimum {}ms between text sends",
                    wait.as_millis(),
                    min_gap.as_millis()
                );
                sleep(wait).await;
            }
        }
    }

    fn send_want_config(&mut self, request_id: u32) -> Result<()> {
        use proto::to_radio::PayloadVariant;
        let msg = proto::ToRadio {
            payload_variant: Some(PayloadVariant::WantConfigId(request_id)),
        };
        self.last_want_config_sent = Some(std::time::Instant::now());
        self.send_toradio(msg)
    }

    fn send_heartbeat(&mut self) -> Result<()> {
        use proto::to_radio::PayloadVariant;
        use proto::{Heartbeat, ToRadio};

        let nonce = (std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis()
            & 0xffff) as u32;
        let hb = Heartbeat { nonce };
        let msg = ToRadio {
            payload_variant: Some(PayloadVariant::Heartbeat(hb)),
        };
        self.send_toradio(msg)
    }

    fn send_toradio(&mut self, msg: proto::ToRadio) -> Result<()> {
        use prost::Message;

        #[cfg(feature = "serial")]
        {
            let mut payload = Vec::with_capacity(256);
            msg.encode(&mut payload)?;
            if payload.len() > u16::MAX as usize {
                return Err(anyhow!("payload too large"));
            }
            let mut hdr = [0u8; 4];
            hdr[0] = 0x94;
            hdr[1] = 0xC3;
            hdr[2] = ((payload.len() >> 8) & 0xFF) as u8;
            hdr[3] = (payload.len() & 0xFF) as u8;

            let mut port = self.port.lock().unwrap();
            port.write_all(&hdr)?;
            port.write_all(&payload)?;
            port.flush()?;

            debug!("Sent ToRadio LEN frame ({} bytes payload)", payload.len());
        }
        Ok(())
    }

    // Removed ensure_want_config: WantConfigId is now sent only once at startup.

    #[allow(dead_code)]
    pub fn set_our_node_id(&mut self, node_id: u32) {
        self.our_node_id = Some(node_id);
        debug!("Writer: set our_node_id to {}", node_id);
    }
}

/// Convenience function to create and initialize the reader/writer system
#[cfg(feature = "meshtastic-proto")]
pub async fn create_reader_writer_system(
    port_name: &str,
    baud_rate: u32,
    tuning: WriterTuning,
) -> Result<(
    MeshtasticReader,
    MeshtasticWriter,
    mpsc::UnboundedReceiver<TextEvent>,
    mpsc::UnboundedReceiver<NodeDetectionEvent>,
    mpsc::UnboundedSender<OutgoingMessage>,
    mpsc::UnboundedSender<ControlMessage>,
    mpsc::UnboundedSender<ControlMessage>,
    mpsc::UnboundedReceiver<u32>,
)> {
    // Create shared serial port
    #[cfg(feature = "serial")]
    let shared_port = create_shared_serial_port(port_name, baud_rate).await?;

    // Create channels
    let (text_event_tx, text_event_rx) = mpsc::unbounded_channel::<TextEvent>();
    let (node_detection_tx, node_detection_rx) = mpsc::unbounded_channel::<NodeDetectionEvent>();
    let (outgoing_tx, outgoing_rx) = mpsc::unbounded_channel::<OutgoingMessage>();
    let (reader_control_tx, reader_control_rx) = mpsc::unbounded_channel::<ControlMessage>();
    let (writer_control_tx, writer_control_rx) = mpsc::unbounded_channel::<ControlMessage>();
    let (node_id_tx, node_id_rx) = mpsc::unbounded_channel::<u32>();

    // Create reader and writer with shared port
    #[cfg(feature = "serial")]
    let reader = MeshtasticReader::new(
        shared_port.clone(),
        text_event_tx,
        node_detection_tx.clone(),
        reader_control_rx,
        writer_control_tx.clone(),
        node_id_tx.clone(),
    )
    .await?;
    #[cfg(feature = "serial")]
    let writer =
        MeshtasticWriter::new(shared_port, outgoing_rx, writer_control_rx, tuning.clone()).await?;

    #[cfg(not(feature = "serial"))]
    let (reader, writer) = {
        warn!("Serial not available, using mock reader/writer");
        (
            MeshtasticReader::new_mock(
                text_event_tx,
                node_detection_tx.clone(),
                reader_control_rx,
                writer_control_tx.clone(),
                node_id_tx.clone(),
            )
            .await?,
            MeshtasticWriter::new_mock(outgoing_rx, writer_control_rx, tuning).await?,
        )
    };

    Ok((
        reader,
        writer,
        text_event_rx,
        node_detection_rx,
        outgoing_tx,
        reader_control_tx,
        writer_control_tx,
        node_id_rx,
    ))
}
