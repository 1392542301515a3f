//! Single-channel relay output driver.
//!
//! Maps the logical [`RelayState`] onto a GPIO level, honouring boards
//! whose relay module energises on a LOW input. After every write the
//! driver reads the output latch back so a pin that failed to switch is
//! reported instead of silently trusted.
//!
//! The driver itself is dumb: it neither persists state nor decides when
//! to switch. `RelayNode` owns that.

use embedded_hal::digital::StatefulOutputPin;
use log::debug;

use crate::app::events::RelayState;
use crate::app::ports::RelayPort;
use crate::error::ActuatorError;

pub struct RelayDriver<P> {
    pin: P,
    active_low: bool,
}

impl<P: StatefulOutputPin> RelayDriver<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    fn level_for(&self, state: RelayState) -> bool {
        matches!(state, RelayState::On) != self.active_low
    }

    fn state_for(&self, level_high: bool) -> RelayState {
        if level_high != self.active_low {
            RelayState::On
        } else {
            RelayState::Off
        }
    }

    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: StatefulOutputPin> RelayPort for RelayDriver<P> {
    fn drive(&mut self, state: RelayState) -> Result<(), ActuatorError> {
        let high = self.level_for(state);
        let res = if high {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        res.map_err(|_| ActuatorError::GpioWriteFailed)?;
        debug!("relay: {} (pin {})", state, if high { "HIGH" } else { "LOW" });
        Ok(())
    }

    fn observe(&mut self) -> Option<RelayState> {
        let high = self.pin.is_set_high().ok()?;
        Some(self.state_for(high))
    }
}
