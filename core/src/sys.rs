use std::collections::HashSet;

use tracing::{info, warn};

use crate::action::Action;
use crate::command::Operation;
use crate::error::{ReconcileError, Result};
use crate::infrastructure::player::PlayerCommandBuilder;
use crate::layout::drift::check_surfaces;
use crate::layout::grid::{compute_grid, GridPlan};
use crate::probe::DisplaySurfaceProbe;
use crate::registry::SessionRegistry;
use crate::types::config::Settings;
use crate::types::geometry::{GridDims, Resolution};
use crate::types::stream::Stream;


/// Central runtime for streamgrid. Converges stream sessions toward the
/// configured stream list, one operation per `execute` call.
pub struct Reconciler<R, P> {
    settings: Settings,
    streams: Vec<Stream>,
    registry: R,
    probe: P,
    player: PlayerCommandBuilder,
    actions: Vec<Action>,
    /// Sessions a dry run has pretended to stop during the current operation.
    assumed_stopped: HashSet<String>,
}


impl<R: SessionRegistry, P: DisplaySurfaceProbe> Reconciler<R, P> {
    pub fn new(settings: Settings, streams: Vec<Stream>, registry: R, probe: P) -> Self {
        let player = PlayerCommandBuilder::from_settings(&settings);
        Reconciler {
            settings,
            streams,
            registry,
            probe,
            player,
            actions: Vec::new(),
            assumed_stopped: HashSet::new(),
        }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// The single dispatch method. Fails on the first error; actions already
    /// taken are not undone.
    pub fn execute(&mut self, op: Operation) -> Result<()> {
        self.actions.clear();
        self.assumed_stopped.clear();
        info!(operation = %op, dry_run = self.settings.dry_run, "executing");

        if self.streams.is_empty() {
            return Err(ReconcileError::InvalidConfiguration(
                "no streams configured".into(),
            ));
        }
        let dims = compute_grid(self.streams.len())?;

        match op {
            Operation::Stop => self.stop(),
            Operation::Start => {
                let plan = self.plan(dims)?;
                self.start(&plan)
            }
            Operation::Restart => {
                let plan = self.plan(dims)?;
                self.restart(&plan)
            }
            Operation::Repair => {
                let plan = self.plan(dims)?;
                self.repair(&plan)
            }
        }
    }

    /// Actions recorded during the last execute() call, including one that failed.
    pub fn pending_actions(&self) -> &[Action] {
        &self.actions
    }

    /// Take and clear recorded actions.
    pub fn drain_actions(&mut self) -> Vec<Action> {
        std::mem::take(&mut self.actions)
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    fn start(&mut self, plan: &GridPlan) -> Result<()> {
        for (idx, (stream, bbox)) in self.streams.iter().zip(plan.boxes()).enumerate() {
            let session = self.settings.session_name(idx);
            if self.is_running(&session)? {
                info!(%session, "already running");
                self.actions.push(Action::AlreadyRunning { session });
                continue;
            }

            let command = self.player.build(stream, bbox);
            info!(%session, stream = %stream.name, window = %bbox, "launching");
            self.actions.push(Action::Launch {
                session: session.clone(),
                stream: stream.name.clone(),
                command: command.clone(),
                dry_run: self.settings.dry_run,
            });
            if !self.settings.dry_run {
                self.registry.create(&session, &command)?;
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        for idx in 0..self.streams.len() {
            let session = self.settings.session_name(idx);
            if !self.is_running(&session)? {
                info!(%session, "already stopped");
                self.actions.push(Action::AlreadyStopped { session });
                continue;
            }
            self.terminate(session)?;
        }
        Ok(())
    }

    fn restart(&mut self, plan: &GridPlan) -> Result<()> {
        self.stop()?;
        let delay = self.settings.settle_delay();
        self.actions.push(Action::Settle {
            delay_ms: self.settings.settle_delay_ms,
        });
        if !self.settings.dry_run && !delay.is_zero() {
            std::thread::sleep(delay);
        }
        self.start(plan)
    }

    /// Relaunch every stream whose expected anchor is not on screen. The live
    /// probe is the only source of truth; session bookkeeping is not trusted.
    ///
    /// `screen -X quit` returns before the session is gone from `screen -list`.
    /// A session still listed when `start` runs is skipped as already running,
    /// so it stays dark until the next repair. Those sessions are logged and
    /// recorded as `NotRelaunched`; the operation still succeeds.
    fn repair(&mut self, plan: &GridPlan) -> Result<()> {
        let observed = self.probe.list_active_surface_anchors()?;
        let mut missing = 0;
        let mut stopped = HashSet::new();
        for check in check_surfaces(plan, &observed) {
            let session = self.settings.session_name(check.index);
            if check.present {
                self.actions.push(Action::SurfacePresent {
                    session,
                    anchor: check.expected,
                });
                continue;
            }

            warn!(%session, anchor = %check.expected, "stream missing from display");
            missing += 1;
            self.actions.push(Action::SurfaceMissing {
                session: session.clone(),
                anchor: check.expected,
            });
            if self.is_running(&session)? {
                if !self.settings.dry_run {
                    stopped.insert(session.clone());
                }
                self.terminate(session)?;
            } else {
                self.actions.push(Action::AlreadyStopped { session });
            }
        }

        if missing == 0 {
            info!("no action required");
            self.actions.push(Action::NoActionRequired);
            return Ok(());
        }

        let first = self.actions.len();
        self.start(plan)?;
        let lingering: Vec<String> = self.actions[first..]
            .iter()
            .filter_map(|a| match a {
                Action::AlreadyRunning { session } if stopped.contains(session) => {
                    Some(session.clone())
                }
                _ => None,
            })
            .collect();
        for session in lingering {
            warn!(%session, "session still registered after stop; not relaunched");
            self.actions.push(Action::NotRelaunched { session });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Lay out the grid on the current display and record it.
    fn plan(&mut self, dims: GridDims) -> Result<GridPlan> {
        let resolution = self.resolution()?;
        let plan = GridPlan::new(dims, self.streams.len(), resolution);
        info!(cols = dims.cols, rows = dims.rows, %resolution, "grid planned");
        self.actions.push(Action::Grid { dims: plan.dims, resolution });
        Ok(plan)
    }

    fn resolution(&self) -> Result<Resolution> {
        match self.settings.resolution_override() {
            Some(res) => Ok(res),
            None => self.probe.current_display_resolution(),
        }
    }

    fn is_running(&self, session: &str) -> Result<bool> {
        if self.assumed_stopped.contains(session) {
            return Ok(false);
        }
        self.registry.exists(session)
    }

    fn terminate(&mut self, session: String) -> Result<()> {
        info!(%session, "stopping");
        self.actions.push(Action::Terminate {
            session: session.clone(),
            dry_run: self.settings.dry_run,
        });
        if self.settings.dry_run {
            self.assumed_stopped.insert(session);
        } else {
            self.registry.terminate(&session)?;
        }
        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::process::CommandSpec;
    use crate::types::geometry::Anchor;
    use std::collections::BTreeSet;

    #[derive(Default)]
    struct FakeRegistry {
        running: BTreeSet<String>,
        created: Vec<(String, CommandSpec)>,
        terminated: Vec<String>,
        fail_create: Option<String>,
        fail_terminate: Option<String>,
        /// Terminated sessions stay listed, like screen still tearing down.
        lingering: bool,
        unavailable: bool,
    }

    impl FakeRegistry {
        fn with_running(names: &[&str]) -> Self {
            FakeRegistry {
                running: names.iter().map(|n| n.to_string()).collect(),
                ..FakeRegistry::default()
            }
        }

        fn created_names(&self) -> Vec<&str> {
            self.created.iter().map(|(n, _)| n.as_str()).collect()
        }
    }

    impl SessionRegistry for FakeRegistry {
        fn exists(&self, name: &str) -> Result<bool> {
            if self.unavailable {
                return Err(ReconcileError::RegistryUnavailable("no screen".into()));
            }
            Ok(self.running.contains(name))
        }

        fn create(&mut self, name: &str, command: &CommandSpec) -> Result<()> {
            if self.fail_create.as_deref() == Some(name) {
                return Err(ReconcileError::LaunchFailed {
                    session: name.into(),
                    exit_code: 1,
                });
            }
            self.running.insert(name.into());
            self.created.push((name.into(), command.clone()));
            Ok(())
        }

        fn terminate(&mut self, name: &str) -> Result<()> {
            if self.fail_terminate.as_deref() == Some(name) {
                return Err(ReconcileError::TerminateFailed {
                    session: name.into(),
                    exit_code: 2,
                });
            }
            if !self.lingering {
                self.running.remove(name);
            }
            self.terminated.push(name.into());
            Ok(())
        }
    }

    struct FakeProbe {
        anchors: BTreeSet<Anchor>,
        resolution: Option<Resolution>,
        unavailable: bool,
    }

    impl FakeProbe {
        fn full_hd(anchors: &[(u32, u32)]) -> Self {
            FakeProbe {
                anchors: anchors.iter().map(|&(x, y)| Anchor { x, y }).collect(),
                resolution: Some(Resolution { width: 1920, height: 1080 }),
                unavailable: false,
            }
        }
    }

    impl DisplaySurfaceProbe for FakeProbe {
        fn list_active_surface_anchors(&self) -> Result<BTreeSet<Anchor>> {
            if self.unavailable {
                return Err(ReconcileError::ProbeUnavailable("vcgencmd exited 1".into()));
            }
            Ok(self.anchors.clone())
        }

        fn current_display_resolution(&self) -> Result<Resolution> {
            self.resolution.ok_or(ReconcileError::ResolutionUnknown)
        }
    }

    fn streams(n: usize) -> Vec<Stream> {
        (0..n)
            .map(|i| Stream {
                name: format!("cam-{}", i),
                uri: format!("rtsp://10.0.0.{}/live", i),
                transport: Default::default(),
            })
            .collect()
    }

    fn settings() -> Settings {
        Settings {
            settle_delay_ms: 0,
            ..Settings::default()
        }
    }

    fn reconciler(
        n: usize,
        registry: FakeRegistry,
        probe: FakeProbe,
    ) -> Reconciler<FakeRegistry, FakeProbe> {
        Reconciler::new(settings(), streams(n), registry, probe)
    }

    #[test]
    fn start_launches_every_stream_in_its_tile() {
        let mut r = reconciler(3, FakeRegistry::default(), FakeProbe::full_hd(&[]));
        r.execute(Operation::Start).unwrap();
        assert_eq!(r.registry().created_names(), vec!["cam0", "cam1", "cam2"]);
        let (_, cmd) = &r.registry().created[2];
        assert!(cmd.args.contains(&"0,540,960,1080".to_string()));
        assert_eq!(cmd.args.last().unwrap(), "rtsp://10.0.0.2/live");
    }

    #[test]
    fn start_is_idempotent() {
        let mut r = reconciler(3, FakeRegistry::default(), FakeProbe::full_hd(&[]));
        r.execute(Operation::Start).unwrap();
        r.execute(Operation::Start).unwrap();
        assert_eq!(r.registry().created.len(), 3);
        let skips = r
            .pending_actions()
            .iter()
            .filter(|a| matches!(a, Action::AlreadyRunning { .. }))
            .count();
        assert_eq!(skips, 3);
    }

    #[test]
    fn start_skips_running_sessions() {
        let reg = FakeRegistry::with_running(&["cam1"]);
        let mut r = reconciler(2, reg, FakeProbe::full_hd(&[]));
        r.execute(Operation::Start).unwrap();
        assert_eq!(r.registry().created_names(), vec!["cam0"]);
    }

    #[test]
    fn start_stops_at_first_launch_failure() {
        let reg = FakeRegistry {
            fail_create: Some("cam1".into()),
            ..FakeRegistry::default()
        };
        let mut r = reconciler(3, reg, FakeProbe::full_hd(&[]));
        let err = r.execute(Operation::Start).unwrap_err();
        assert!(matches!(err, ReconcileError::LaunchFailed { ref session, .. } if session == "cam1"));
        // cam0 stays up, cam2 never attempted.
        assert_eq!(r.registry().created_names(), vec!["cam0"]);
        assert!(r.registry().terminated.is_empty());
    }

    #[test]
    fn stop_without_sessions_is_noop() {
        let mut r = reconciler(1, FakeRegistry::default(), FakeProbe::full_hd(&[]));
        r.execute(Operation::Stop).unwrap();
        assert!(r.registry().terminated.is_empty());
        assert_eq!(
            r.pending_actions(),
            &[Action::AlreadyStopped { session: "cam0".into() }]
        );
    }

    #[test]
    fn stop_does_not_need_display() {
        let reg = FakeRegistry::with_running(&["cam0", "cam1"]);
        let probe = FakeProbe {
            anchors: BTreeSet::new(),
            resolution: None,
            unavailable: false,
        };
        let mut r = reconciler(2, reg, probe);
        r.execute(Operation::Stop).unwrap();
        assert_eq!(r.registry().terminated, vec!["cam0", "cam1"]);
    }

    #[test]
    fn stop_aborts_at_first_terminate_failure() {
        let reg = FakeRegistry {
            fail_terminate: Some("cam1".into()),
            ..FakeRegistry::with_running(&["cam0", "cam1", "cam2"])
        };
        let mut r = reconciler(3, reg, FakeProbe::full_hd(&[]));
        let err = r.execute(Operation::Stop).unwrap_err();
        assert!(
            matches!(err, ReconcileError::TerminateFailed { ref session, exit_code: 2 } if session == "cam1")
        );
        assert_eq!(r.registry().terminated, vec!["cam0"]);
        assert!(r.registry().running.contains("cam2"));
    }

    #[test]
    fn restart_skips_start_when_stop_fails() {
        let reg = FakeRegistry {
            fail_terminate: Some("cam0".into()),
            ..FakeRegistry::with_running(&["cam0"])
        };
        let mut r = reconciler(2, reg, FakeProbe::full_hd(&[]));
        assert!(matches!(
            r.execute(Operation::Restart),
            Err(ReconcileError::TerminateFailed { .. })
        ));
        assert!(r.registry().created.is_empty());
        assert!(!r
            .pending_actions()
            .iter()
            .any(|a| matches!(a, Action::Settle { .. } | Action::Launch { .. })));
    }

    #[test]
    fn restart_stops_then_starts_all() {
        let reg = FakeRegistry::with_running(&["cam0"]);
        let mut r = reconciler(2, reg, FakeProbe::full_hd(&[]));
        r.execute(Operation::Restart).unwrap();
        assert_eq!(r.registry().terminated, vec!["cam0"]);
        assert_eq!(r.registry().created_names(), vec!["cam0", "cam1"]);
        let settle = r
            .pending_actions()
            .iter()
            .position(|a| matches!(a, Action::Settle { .. }))
            .unwrap();
        let first_launch = r
            .pending_actions()
            .iter()
            .position(|a| matches!(a, Action::Launch { .. }))
            .unwrap();
        assert!(settle < first_launch);
    }

    #[test]
    fn repair_noop_when_all_displayed() {
        let reg = FakeRegistry::with_running(&["cam0", "cam1", "cam2"]);
        let probe = FakeProbe::full_hd(&[(0, 0), (960, 0), (0, 540)]);
        let mut r = reconciler(3, reg, probe);
        r.execute(Operation::Repair).unwrap();
        assert!(r.registry().created.is_empty());
        assert!(r.registry().terminated.is_empty());
        assert_eq!(r.pending_actions().last(), Some(&Action::NoActionRequired));
    }

    #[test]
    fn repair_restarts_only_missing_stream() {
        let reg = FakeRegistry::with_running(&["cam0", "cam1", "cam2"]);
        let probe = FakeProbe::full_hd(&[(0, 0), (960, 0)]);
        let mut r = reconciler(3, reg, probe);
        r.execute(Operation::Repair).unwrap();
        assert_eq!(r.registry().terminated, vec!["cam2"]);
        assert_eq!(r.registry().created_names(), vec!["cam2"]);
    }

    #[test]
    fn repair_tolerates_dead_session() {
        // cam1 vanished entirely: no session and no surface.
        let reg = FakeRegistry::with_running(&["cam0"]);
        let probe = FakeProbe::full_hd(&[(0, 0)]);
        let mut r = reconciler(2, reg, probe);
        r.execute(Operation::Repair).unwrap();
        assert!(r.registry().terminated.is_empty());
        assert_eq!(r.registry().created_names(), vec!["cam1"]);
    }

    #[test]
    fn repair_aborts_when_display_query_fails() {
        let reg = FakeRegistry::with_running(&["cam0", "cam1"]);
        let probe = FakeProbe {
            unavailable: true,
            ..FakeProbe::full_hd(&[])
        };
        let mut r = reconciler(2, reg, probe);
        assert!(matches!(
            r.execute(Operation::Repair),
            Err(ReconcileError::ProbeUnavailable(_))
        ));
        assert!(r.registry().terminated.is_empty());
        assert!(r.registry().created.is_empty());
    }

    #[test]
    fn repair_reports_session_still_registered_after_stop() {
        let reg = FakeRegistry {
            lingering: true,
            ..FakeRegistry::with_running(&["cam0", "cam1"])
        };
        let probe = FakeProbe::full_hd(&[(0, 0)]);
        let mut r = reconciler(2, reg, probe);
        r.execute(Operation::Repair).unwrap();
        assert_eq!(r.registry().terminated, vec!["cam1"]);
        assert!(r.registry().created.is_empty());
        let tail = &r.pending_actions()[r.pending_actions().len() - 2..];
        assert_eq!(
            tail,
            &[
                Action::AlreadyRunning { session: "cam1".into() },
                Action::NotRelaunched { session: "cam1".into() },
            ]
        );
    }

    #[test]
    fn dry_run_start_reports_without_launching() {
        let mut s = settings();
        s.dry_run = true;
        let mut r = Reconciler::new(s, streams(2), FakeRegistry::default(), FakeProbe::full_hd(&[]));
        r.execute(Operation::Start).unwrap();
        assert!(r.registry().created.is_empty());
        let launches = r
            .pending_actions()
            .iter()
            .filter(|a| matches!(a, Action::Launch { dry_run: true, .. }))
            .count();
        assert_eq!(launches, 2);
    }

    #[test]
    fn dry_run_restart_reports_full_cycle() {
        let mut s = settings();
        s.dry_run = true;
        let reg = FakeRegistry::with_running(&["cam0", "cam1"]);
        let mut r = Reconciler::new(s, streams(2), reg, FakeProbe::full_hd(&[]));
        r.execute(Operation::Restart).unwrap();
        assert!(r.registry().terminated.is_empty());
        assert!(r.registry().created.is_empty());
        let actions = r.pending_actions();
        let stops = actions
            .iter()
            .filter(|a| matches!(a, Action::Terminate { dry_run: true, .. }))
            .count();
        let starts = actions
            .iter()
            .filter(|a| matches!(a, Action::Launch { dry_run: true, .. }))
            .count();
        assert_eq!((stops, starts), (2, 2));
    }

    #[test]
    fn dry_run_repair_reports_relaunch() {
        let mut s = settings();
        s.dry_run = true;
        let reg = FakeRegistry::with_running(&["cam0", "cam1", "cam2"]);
        let probe = FakeProbe::full_hd(&[(0, 0), (960, 0)]);
        let mut r = Reconciler::new(s, streams(3), reg, probe);
        r.execute(Operation::Repair).unwrap();
        assert!(r.registry().terminated.is_empty());
        assert!(r.registry().created.is_empty());
        let launched: Vec<&str> = r
            .pending_actions()
            .iter()
            .filter_map(|a| match a {
                Action::Launch { session, .. } => Some(session.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(launched, vec!["cam2"]);
    }

    #[test]
    fn empty_stream_list_is_invalid() {
        let mut r = reconciler(0, FakeRegistry::default(), FakeProbe::full_hd(&[]));
        assert!(matches!(
            r.execute(Operation::Start),
            Err(ReconcileError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn seven_streams_rejected_before_any_action() {
        let mut r = reconciler(7, FakeRegistry::default(), FakeProbe::full_hd(&[]));
        assert!(matches!(
            r.execute(Operation::Stop),
            Err(ReconcileError::UnsupportedCardinality(7))
        ));
        assert!(r.pending_actions().is_empty());
    }

    #[test]
    fn unknown_resolution_aborts_start() {
        let probe = FakeProbe {
            anchors: BTreeSet::new(),
            resolution: None,
            unavailable: false,
        };
        let mut r = reconciler(2, FakeRegistry::default(), probe);
        assert!(matches!(
            r.execute(Operation::Start),
            Err(ReconcileError::ResolutionUnknown)
        ));
        assert!(r.registry().created.is_empty());
    }

    #[test]
    fn resolution_override_skips_probe() {
        let mut s = settings();
        s.resolution = Some((1280, 720));
        let probe = FakeProbe {
            anchors: BTreeSet::new(),
            resolution: None,
            unavailable: false,
        };
        let mut r = Reconciler::new(s, streams(2), FakeRegistry::default(), probe);
        r.execute(Operation::Start).unwrap();
        let (_, cmd) = &r.registry().created[1];
        assert!(cmd.args.contains(&"640,0,1280,360".to_string()));
    }

    #[test]
    fn registry_unavailable_is_fatal() {
        let reg = FakeRegistry {
            unavailable: true,
            ..FakeRegistry::default()
        };
        let mut r = reconciler(1, reg, FakeProbe::full_hd(&[]));
        assert!(matches!(
            r.execute(Operation::Stop),
            Err(ReconcileError::RegistryUnavailable(_))
        ));
    }

    #[test]
    fn drain_actions_clears() {
        let mut r = reconciler(1, FakeRegistry::default(), FakeProbe::full_hd(&[]));
        r.execute(Operation::Start).unwrap();
        let drained = r.drain_actions();
        assert!(!drained.is_empty());
        assert!(r.pending_actions().is_empty());
    }
}
