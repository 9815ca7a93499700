//! BLAKE3 state hashing for determinism checks.
//!
//! [`Simulation::state_hash`] digests everything that affects future ticks:
//! config, objects (timelines, queued thrust, hitbox caches, markers),
//! lifecycle links, held inputs and the world clock. Two runs from the same
//! setup with the same inputs produce the same hash.
//!
//! Pilots are not part of the hash: they are behaviour, not state. A seeded
//! [`WanderController`](crate::controller::WanderController) is still
//! deterministic because its seed fixes every decision it will make.
//!
//! ```
//! use timeloop_engine::prelude::*;
//!
//! let run = || {
//!     let mut sim = Simulation::new(SimulationConfig { total_ticks: 50, ..Default::default() });
//!     sim.spawn(
//!         SpaceTimePosition::new(0, Vec2::ZERO, 0.0),
//!         SpaceSpeed::new(Vec2::new(3.0, 1.0), 0.01),
//!     );
//!     sim.run_ticks(120).unwrap();
//!     sim.state_hash().unwrap()
//! };
//! let hash = run();
//! assert_eq!(hash.len(), 64);
//! assert_eq!(hash, run());
//! ```

use crate::world::Simulation;
use crate::{SimError, SimResult};

impl Simulation {
    /// BLAKE3 hex digest (64 lowercase hex chars) of the serialized state.
    pub fn state_hash(&self) -> SimResult<String> {
        let json_bytes = serde_json::to_vec(self).map_err(SimError::Snapshot)?;
        Ok(blake3::hash(&json_bytes).to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use timeloop_core::spacetime::{SpaceSpeed, SpaceTimePosition, Vec2};

    use crate::config::SimulationConfig;
    use crate::world::Simulation;

    fn sim() -> Simulation {
        let mut sim = Simulation::new(SimulationConfig {
            total_ticks: 20,
            ..Default::default()
        });
        sim.spawn(
            SpaceTimePosition::new(0, Vec2::ZERO, 0.0),
            SpaceSpeed::new(Vec2::new(1.0, 0.5), 0.0),
        );
        sim
    }

    #[test]
    fn hash_changes_when_state_changes() {
        let mut sim = sim();
        let before = sim.state_hash().unwrap();
        sim.tick().unwrap();
        assert_ne!(sim.state_hash().unwrap(), before);
    }

    #[test]
    fn hash_is_stable_without_ticks() {
        let sim = sim();
        assert_eq!(sim.state_hash().unwrap(), sim.state_hash().unwrap());
    }
}
