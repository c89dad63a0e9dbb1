//! OS signal wiring (spec.md §6): `INT`/`TERM` for graceful shutdown, plus
//! user-defined signals for an immediate cycle trigger and a config reload
//! hint.

use tokio::signal::unix::{signal, Signal, SignalKind};

pub struct Signals {
    pub interrupt: Signal,
    pub terminate: Signal,
    pub trigger: Signal,
    pub reload: Signal,
}

impl Signals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
            trigger: signal(SignalKind::user_defined1())?,
            reload: signal(SignalKind::user_defined2())?,
        })
    }
}
