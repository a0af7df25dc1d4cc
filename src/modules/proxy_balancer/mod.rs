//! # Proxy Balancer Module
//!
//! Makes a pool of servers reachable behind one virtual proxy address on a
//! single OpenFlow switch.
//!
//! ## Features
//!
//! - **ARP Spoofing**: Every host resolves its peers to the proxy link address
//! - **Flow Admission**: Each new client flow is bound to one server by a pair
//!   of rewrite rules installed on the switch
//! - **Scheduling**: Random or round-robin server selection, per switch
//! - **Passthrough**: Server packets that miss the flow table are rewritten
//!   and forwarded by the controller
//! - **Port Statistics**: Periodic polling of switch port counters
//!
//! ## Architecture
//!
//! ```text
//!                ┌──────────────────────────────┐
//!  SwitchEvent ─▶│          Controller          │
//!                │  ┌────────────┐              │
//!                │  │  Session   │──┬─▶ ARP responder
//!                │  │ (per dpid) │  ├─▶ Flow admission ─▶ Scheduler
//!                │  └────────────┘  └─▶ Passthrough
//!                │        │                     │
//!                │  ┌────────────┐              │
//!                │  │ Host       │ clients, servers, proxy
//!                │  │ Registry   │              │
//!                │  └────────────┘              │
//!                └──────────────────────────────┘
//! ```

pub mod arp;
pub mod config;
pub mod controller;
pub mod error;
pub mod flow;
pub mod host;
pub mod scheduler;
pub mod session;
pub mod stats;

pub use arp::ArpResponder;
pub use config::{BalancerConfig, HostRangeConfig, NetworkConfig, ProxyConfig, SchedulingPolicy};
pub use controller::Controller;
pub use error::{BalancerError, BalancerResult};
pub use flow::{admit_flow, passthrough, AdmissionPlan, FlowTimeouts};
pub use host::{AddressPlan, Host, HostPool, HostRegistry};
pub use scheduler::{RandomStrategy, RoundRobinStrategy, Scheduler, Strategy};
pub use session::{PacketDisposition, Session, SessionSettings, SessionState};
pub use stats::BalancerStats;
