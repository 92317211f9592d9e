use std::cell::RefCell;
use std::rc::Rc;

use glam::DVec3;
use stride::config::{UpdaterConfig, NamedUpdater};
use stride::core::solve::SymplecticEuler;
use stride::core::state::{ParticleData, SystemDefinition};
use stride::updaters::{Schedule, Updater};
use stride::simulation::Simulation;

/// Logs every timestep it fires on together with particle 0's position.
struct Tally {
    schedule: Schedule,
    seen: Rc<RefCell<Vec<(u64, DVec3)>>>,
}

impl Tally {
    fn new(period: u64, phase: i64) -> (Self, Rc<RefCell<Vec<(u64, DVec3)>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let tally = Self {
            schedule: Schedule::new(period, phase).unwrap(),
            seen: Rc::clone(&seen),
        };
        (tally, seen)
    }
}

impl Updater for Tally {
    fn kind(&self) -> &'static str {
        "tally"
    }

    fn schedule(&self) -> Schedule {
        self.schedule
    }

    fn apply(&mut self, timestep: u64, pdata: &mut ParticleData) -> stride::Result<()> {
        self.seen.borrow_mut().push((timestep, pdata.pos[0]));
        Ok(())
    }

    fn metadata(&self) -> UpdaterConfig {
        UpdaterConfig::ZeroMomentum {
            schedule: self.schedule,
        }
    }
}

fn simulation() -> Simulation {
    let mut pdata = ParticleData::new(1);
    pdata.vel[0] = DVec3::X;
    Simulation::new(SystemDefinition::new(3).unwrap(), pdata, SymplecticEuler, 1.0).unwrap()
}

#[test]
fn test_phase_offsets_first_firing() {
    let mut sim = simulation();
    let (in_phase, in_phase_log) = Tally::new(10, 10);
    let (aligned, aligned_log) = Tally::new(10, 0);
    sim.add_updater("phase10", in_phase).unwrap();
    sim.add_updater("phase0", aligned).unwrap();

    sim.run(9).unwrap();
    sim.run(89).unwrap();

    assert_eq!(sim.timestep(), 98);
    assert_eq!(in_phase_log.borrow().len(), 9);
    assert_eq!(aligned_log.borrow().len(), 10);
}

#[test]
fn test_period_ten_fires_on_multiples() {
    let mut sim = simulation();
    let (tally, log) = Tally::new(10, 0);
    sim.add_updater("tally", tally).unwrap();
    sim.run(100).unwrap();

    let steps: Vec<u64> = log.borrow().iter().map(|(t, _)| *t).collect();
    assert_eq!(steps, (0..100).step_by(10).collect::<Vec<_>>());
}

#[test]
fn test_late_registration_with_phase_minus_one() {
    let mut sim = simulation();
    sim.run(7).unwrap();
    let (tally, log) = Tally::new(5, -1);
    sim.add_updater("late", tally).unwrap();
    sim.run(13).unwrap();

    let steps: Vec<u64> = log.borrow().iter().map(|(t, _)| *t).collect();
    assert_eq!(steps, vec![7, 12, 17]);
}

#[test]
fn test_updaters_run_after_the_integrator() {
    let mut sim = simulation();
    let (tally, log) = Tally::new(1, 0);
    sim.add_updater("tally", tally).unwrap();
    sim.run(3).unwrap();

    // Unit velocity and dt = 1: the integrator has already moved the
    // particle when step t's updaters see it.
    let xs: Vec<f64> = log.borrow().iter().map(|(_, p)| p.x).collect();
    assert_eq!(xs, vec![1.0, 2.0, 3.0]);
}

#[test]
fn test_registry_metadata_keeps_order() {
    let sysdef = SystemDefinition::new(2).unwrap();
    let mut sim = Simulation::new(sysdef, ParticleData::new(4), SymplecticEuler, 0.01).unwrap();
    let configs = [
        NamedUpdater {
            name: "zero".into(),
            config: UpdaterConfig::ZeroMomentum {
                schedule: Schedule::new(50, -1).unwrap(),
            },
        },
        NamedUpdater {
            name: "planar".into(),
            config: UpdaterConfig::Enforce2D,
        },
    ];
    for named in &configs {
        let updater = named.config.build(&sim.sysdef).unwrap();
        sim.updaters.add_boxed(named.name.clone(), updater, 0).unwrap();
    }

    let metadata = sim.updaters.metadata();
    assert_eq!(metadata.len(), 2);
    assert_eq!(metadata[0].0, "zero");
    assert_eq!(metadata[0].1, configs[0].config);
    assert_eq!(metadata[1].1, UpdaterConfig::Enforce2D);
}
