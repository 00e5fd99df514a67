// Copyright 2026 the Tendril Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The render engine: cycle state machine, unit of work, and commit driver.
//!
//! An [`Engine`] owns the host, the fiber store, and every scheduling pointer.
//! A cycle goes through three steps:
//!
//! 1. A trigger ([`Engine::render`] or a state [`Setter`]) creates a fresh
//!    work-in-progress root whose alternate is the current root.
//! 2. [`Engine::work_loop`] walks the new tree one fiber per unit, yielding
//!    whenever the host's idle budget runs low.
//! 3. When the walk is exhausted, the same slice commits and the new tree
//!    becomes current.
//!
//! A later trigger replaces an uncommitted walk; the abandoned fibers are
//! freed. State updates never restart a walk mid-slice: the request is
//! honored at the start of the next slice, or right after the commit that
//! ends the current one.
//!
//! [`Setter`]: crate::hooks::Setter

use alloc::rc::Rc;
use alloc::vec::Vec;
use core::fmt;

use crate::commit::{CommitLog, commit_root, settle_hooks, update_props};
use crate::element::{Element, ElementKind, Props};
use crate::error::RenderError;
use crate::fiber::{FiberId, FiberStore, INVALID};
use crate::hooks::{HookCell, Hooks};
use crate::host::{Host, IdleDeadline, IdleScheduler, NodeKind};
use crate::reconcile::reconcile_children;
use crate::scheduler::{RenderSignal, SchedulerConfig, WorkPhase, WorkStatus};
use crate::trace::{
    AbandonEvent, CycleCause, CycleStartEvent, CycleSummary, Tracer, UnitEvent, UnitKind,
    YieldEvent,
};

/// Incremental reconciliation engine over a [`Host`].
pub struct Engine<H: Host> {
    host: H,
    store: FiberStore<H::Node>,
    config: SchedulerConfig,

    current_root: u32,
    wip_root: u32,
    next_unit: u32,
    deletions: Vec<FiberId>,

    signal: Rc<RenderSignal>,

    // -- Cycle bookkeeping --
    cycle: u64,
    cause: CycleCause,
    units: u32,
    yields: u32,
    started: Option<CycleStartEvent>,
    abandoned: Option<AbandonEvent>,
}

impl<H: Host> fmt::Debug for Engine<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("config", &self.config)
            .field("phase", &self.phase())
            .field("cycle", &self.cycle)
            .field("deletions", &self.deletions.len())
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl<H: Host> Engine<H> {
    /// Creates an idle engine driving `host`.
    pub fn new(host: H, config: SchedulerConfig) -> Self {
        Self {
            host,
            store: FiberStore::new(),
            config,
            current_root: INVALID,
            wip_root: INVALID,
            next_unit: INVALID,
            deletions: Vec::new(),
            signal: Rc::default(),
            cycle: 0,
            cause: CycleCause::Render,
            units: 0,
            yields: 0,
            started: None,
            abandoned: None,
        }
    }

    /// Installs the callback used to ask the host for another slice.
    ///
    /// Without one, the caller must drive [`work_loop`](Self::work_loop)
    /// itself (see [`has_pending_work`](Self::has_pending_work)).
    pub fn set_idle_scheduler(&mut self, scheduler: impl IdleScheduler + 'static) {
        self.signal.set_scheduler(Rc::new(scheduler));
    }

    /// Starts a cycle rendering `element` into `container`.
    ///
    /// No host mutation happens here; the tree is walked by later
    /// [`work_loop`](Self::work_loop) slices and committed at the end. An
    /// uncommitted walk in progress is abandoned.
    pub fn render(&mut self, element: impl Into<Element>, container: H::Node) {
        self.abandon_wip();
        self.start_cycle(container, element.into(), CycleCause::Render);
    }

    /// Runs one slice: performs units of work until `deadline` runs low, and
    /// commits if the walk completes.
    ///
    /// # Errors
    ///
    /// Returns the first host or hook failure. The in-progress cycle is then
    /// abandoned and the last committed tree stays current. A host failure
    /// during commit may leave the host tree partially updated.
    pub fn work_loop(
        &mut self,
        deadline: &dyn IdleDeadline,
        tracer: &mut Tracer<'_>,
    ) -> Result<WorkStatus, RenderError<H::Error>> {
        // An explicit render in flight picks pending updates up as it goes;
        // anything it misses is handled after its commit.
        let restart = self.current_root != INVALID
            && (self.wip_root == INVALID || self.cause == CycleCause::StateUpdate);
        if restart && self.signal.take() {
            self.restart_from_current();
        }
        self.flush_notices(tracer);

        if self.wip_root == INVALID {
            return Ok(WorkStatus::Idle);
        }

        let mut slice_units = 0;
        while self.next_unit != INVALID {
            let idx = self.next_unit;
            self.next_unit = match self.perform_unit_of_work(idx) {
                Ok(next) => next,
                Err(e) => {
                    self.abandon_wip();
                    self.flush_notices(tracer);
                    return Err(e);
                }
            };
            slice_units += 1;
            self.units += 1;
            tracer.unit(&UnitEvent {
                cycle: self.cycle,
                fiber: self.store.handle(idx),
                kind: UnitKind::from(self.store.element_at(idx).kind()),
                effect: self.store.effect[idx as usize],
            });

            if self.next_unit == INVALID {
                break;
            }
            let remaining = deadline.time_remaining();
            if self.config.should_yield(remaining, slice_units) {
                self.yields += 1;
                tracer.yielded(&YieldEvent {
                    cycle: self.cycle,
                    units: slice_units,
                    time_remaining_ms: remaining,
                });
                self.signal.request_idle();
                return Ok(WorkStatus::Yielded);
            }
        }

        let summary = self.commit(tracer)?;
        if self.signal.take() {
            self.restart_from_current();
            self.flush_notices(tracer);
        }
        Ok(WorkStatus::Committed(summary))
    }

    /// Returns where the engine is between slices.
    #[must_use]
    pub fn phase(&self) -> WorkPhase {
        if self.wip_root == INVALID {
            WorkPhase::Idle
        } else {
            WorkPhase::Walking
        }
    }

    /// Returns whether a walk is in progress or a state update is waiting
    /// for a slice.
    #[must_use]
    pub fn has_pending_work(&self) -> bool {
        self.wip_root != INVALID || self.signal.is_requested()
    }

    /// Returns the root of the committed tree, if anything has committed.
    #[must_use]
    pub fn current_root(&self) -> Option<FiberId> {
        (self.current_root != INVALID).then(|| self.store.handle(self.current_root))
    }

    /// Returns the root of the tree being walked, if any.
    #[must_use]
    pub fn wip_root(&self) -> Option<FiberId> {
        (self.wip_root != INVALID).then(|| self.store.handle(self.wip_root))
    }

    /// Returns the number of cycles started so far.
    #[must_use]
    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    /// Returns the scheduler configuration.
    #[must_use]
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Returns the fiber store.
    #[must_use]
    pub fn store(&self) -> &FiberStore<H::Node> {
        &self.store
    }

    /// Returns the host.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Returns the host mutably.
    ///
    /// Mutating nodes owned by the committed tree desynchronizes the next
    /// diff.
    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    // -- Cycle management --

    fn start_cycle(&mut self, container: H::Node, child: Element, cause: CycleCause) {
        let alternate = self.current_root();
        let root = self.store.create_root(container, child, alternate);
        self.wip_root = root.idx;
        self.next_unit = root.idx;
        self.deletions.clear();

        self.cycle += 1;
        self.cause = cause;
        self.units = 0;
        self.yields = 0;
        self.started = Some(CycleStartEvent {
            cycle: self.cycle,
            cause,
        });
        self.signal.request_idle();
    }

    /// Re-renders the committed tree from its root.
    fn restart_from_current(&mut self) {
        let current = self.current_root;
        if current == INVALID {
            return;
        }
        let Some(container) = self.store.host_node[current as usize].clone() else {
            return;
        };
        let Some(child) = self.store.element_at(current).props().children().first().cloned()
        else {
            return;
        };
        self.abandon_wip();
        self.start_cycle(container, child, CycleCause::StateUpdate);
    }

    fn abandon_wip(&mut self) {
        if self.wip_root == INVALID {
            return;
        }
        self.store.free_subtree(self.wip_root);
        self.wip_root = INVALID;
        self.next_unit = INVALID;
        self.deletions.clear();
        // A cycle whose start was never reported is dropped silently.
        if self.started.take().is_none() {
            self.abandoned = Some(AbandonEvent {
                cycle: self.cycle,
                units: self.units,
            });
        }
    }

    fn flush_notices(&mut self, tracer: &mut Tracer<'_>) {
        if let Some(e) = self.abandoned.take() {
            tracer.abandon(&e);
        }
        if let Some(e) = self.started.take() {
            tracer.cycle_start(&e);
        }
    }

    // -- Unit of work --

    /// Processes one fiber and returns the next one in walk order.
    fn perform_unit_of_work(&mut self, idx: u32) -> Result<u32, RenderError<H::Error>> {
        let element = self.store.element_at(idx).clone();
        let fiber = self.store.handle(idx);

        if let ElementKind::Component(component) = element.kind() {
            let alt = self.store.alternate[idx as usize];
            let previous: &[HookCell] = if alt == INVALID {
                &[]
            } else {
                &self.store.hooks[alt as usize]
            };
            let mut hooks = Hooks::new(component.name(), previous, alt != INVALID, &self.signal);
            let child = component.render(element.props(), &mut hooks)?;
            let cells = hooks.finish()?;
            self.store.hooks[idx as usize] = cells;
            reconcile_children(
                &mut self.store,
                fiber,
                core::slice::from_ref(&child),
                &mut self.deletions,
            );
        } else {
            if self.store.host_node[idx as usize].is_none() {
                let kind = match element.kind() {
                    ElementKind::Host(tag) => Some(NodeKind::Element(tag)),
                    ElementKind::Text => Some(NodeKind::Text),
                    ElementKind::Root | ElementKind::Component(_) => None,
                };
                if let Some(kind) = kind {
                    let node = self.host.create_node(kind).map_err(RenderError::Host)?;
                    update_props(&mut self.host, &node, &Props::default(), element.props())
                        .map_err(RenderError::Host)?;
                    self.store.host_node[idx as usize] = Some(node);
                }
            }
            reconcile_children(
                &mut self.store,
                fiber,
                element.props().children(),
                &mut self.deletions,
            );
        }

        Ok(self.store.next_in_walk(idx, self.wip_root))
    }

    // -- Commit --

    fn commit(&mut self, tracer: &mut Tracer<'_>) -> Result<CycleSummary, RenderError<H::Error>> {
        let root = self.wip_root;
        let deletions = core::mem::take(&mut self.deletions);
        let mut log = CommitLog::default();
        if let Err(e) = commit_root(&mut self.host, &mut self.store, root, &deletions, &mut log)
        {
            self.abandon_wip();
            self.flush_notices(tracer);
            return Err(RenderError::Host(e));
        }
        settle_hooks(&mut self.store, root);

        if self.current_root != INVALID {
            self.store.free_subtree(self.current_root);
        }
        self.store.clear_alternates(root);
        self.current_root = root;
        self.wip_root = INVALID;
        self.next_unit = INVALID;

        let mut summary = CycleSummary {
            cycle: self.cycle,
            cause: Some(self.cause),
            units: self.units,
            yields: self.yields,
            ..CycleSummary::default()
        };
        log.fill(&mut summary);
        #[cfg(feature = "trace-rich")]
        tracer.effects(self.cycle, &log.records);
        tracer.cycle_summary(&summary);
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::String;
    use alloc::vec;
    use core::cell::{Cell, RefCell};

    use super::*;
    use crate::element::{AttrValue, Handler, RenderPtr, component, h, text};
    use crate::error::HookError;
    use crate::fiber::Effect;
    use crate::hooks::Setter;
    use crate::scheduler::{CountdownDeadline, Unbounded};

    /// Host double with numbered nodes and an operation log.
    #[derive(Debug, Default)]
    struct Log {
        next: u32,
        ops: Vec<String>,
        fail_on_create: bool,
        fail_on_set: bool,
    }

    impl Host for Log {
        type Node = u32;
        type Error = &'static str;

        fn create_node(&mut self, kind: NodeKind<'_>) -> Result<u32, &'static str> {
            if self.fail_on_create {
                return Err("create refused");
            }
            self.next += 1;
            self.ops.push(alloc::format!("create {} {kind:?}", self.next));
            Ok(self.next)
        }
        fn set_property(&mut self, n: &u32, key: &str, v: &AttrValue) -> Result<(), &'static str> {
            if self.fail_on_set {
                return Err("set refused");
            }
            self.ops.push(alloc::format!("set {n} {key}={}", v.to_text()));
            Ok(())
        }
        fn clear_property(&mut self, n: &u32, key: &str) -> Result<(), &'static str> {
            self.ops.push(alloc::format!("clear {n} {key}"));
            Ok(())
        }
        fn add_listener(&mut self, n: &u32, e: &str, _: &Handler) -> Result<(), &'static str> {
            self.ops.push(alloc::format!("listen {n} {e}"));
            Ok(())
        }
        fn remove_listener(&mut self, n: &u32, e: &str, _: &Handler) -> Result<(), &'static str> {
            self.ops.push(alloc::format!("unlisten {n} {e}"));
            Ok(())
        }
        fn append_child(&mut self, p: &u32, c: &u32) -> Result<(), &'static str> {
            self.ops.push(alloc::format!("append {p} {c}"));
            Ok(())
        }
        fn remove_child(&mut self, p: &u32, c: &u32) -> Result<(), &'static str> {
            self.ops.push(alloc::format!("remove {p} {c}"));
            Ok(())
        }
    }

    fn engine() -> Engine<Log> {
        Engine::new(Log::default(), SchedulerConfig::synchronous())
    }

    fn run(engine: &mut Engine<Log>) -> CycleSummary {
        match engine.work_loop(&Unbounded, &mut Tracer::none()) {
            Ok(WorkStatus::Committed(summary)) => summary,
            other => panic!("expected a commit, got {other:?}"),
        }
    }

    #[test]
    fn nothing_touches_the_host_before_commit() {
        let mut engine = Engine::new(Log::default(), SchedulerConfig::default());
        engine.render(h("div").child("a").child("b"), 0);
        assert_eq!(engine.phase(), WorkPhase::Walking);

        // Root, div, then yield.
        let status = engine.work_loop(&CountdownDeadline::new(2), &mut Tracer::none());
        assert_eq!(status, Ok(WorkStatus::Yielded));
        assert!(
            engine.host().ops.iter().all(|op| !op.starts_with("append")),
            "no placement before commit: {:?}",
            engine.host().ops
        );

        let summary = run(&mut engine);
        assert_eq!(summary.placements, 3);
        assert_eq!(summary.yields, 1);
        assert_eq!(summary.units, 4);
        assert_eq!(engine.phase(), WorkPhase::Idle);
        assert!(engine.host().ops.contains(&String::from("append 0 1")));
    }

    #[test]
    fn same_tree_twice_is_idempotent() {
        let mut engine = engine();
        let tree = || h("div").attr("id", "x").child("hi").build();
        engine.render(tree(), 0);
        run(&mut engine);
        engine.host_mut().ops.clear();

        engine.render(tree(), 0);
        let summary = run(&mut engine);
        assert_eq!(summary.placements, 0);
        assert_eq!(summary.deletions, 0);
        assert_eq!(summary.changed_updates, 0);
        assert_eq!(summary.updates, 2);
        assert!(engine.host().ops.is_empty(), "{:?}", engine.host().ops);
    }

    #[test]
    fn superseded_tree_is_freed() {
        let mut engine = engine();
        engine.render(h("div").child("a"), 0);
        run(&mut engine);
        let first = engine.current_root().unwrap();
        assert_eq!(engine.store().live_count(), 3);

        engine.render(h("div").child("a"), 0);
        run(&mut engine);
        assert!(!engine.store().is_alive(first));
        assert_eq!(engine.store().live_count(), 3);
        let root = engine.current_root().unwrap();
        let div = engine.store().child(root).unwrap();
        assert_eq!(engine.store().alternate(div), None);
        assert_eq!(engine.store().effect(div), Effect::Update);
    }

    #[test]
    fn kind_change_replaces_node() {
        let mut engine = engine();
        engine.render(h("div").child(h("p")), 0);
        run(&mut engine);
        engine.host_mut().ops.clear();

        engine.render(h("div").child(h("span")), 0);
        let summary = run(&mut engine);
        assert_eq!(summary.deletions, 1);
        assert_eq!(summary.placements, 1);
        let ops = &engine.host().ops;
        assert_eq!(ops[0], "create 3 Element(\"span\")");
        assert_eq!(ops[1], "remove 1 2");
        assert_eq!(ops[2], "append 1 3");
    }

    #[test]
    fn host_error_abandons_cycle() {
        let mut engine = engine();
        engine.host_mut().fail_on_create = true;
        engine.render(h("div"), 0);
        let err = engine.work_loop(&Unbounded, &mut Tracer::none());
        assert_eq!(err, Err(RenderError::Host("create refused")));
        assert_eq!(engine.phase(), WorkPhase::Idle);
        assert_eq!(engine.current_root(), None);
        assert_eq!(engine.store().live_count(), 0);
    }

    #[test]
    fn render_abandons_walk_in_progress() {
        let mut engine = Engine::new(Log::default(), SchedulerConfig::default());
        engine.render(h("div").child("a").child("b"), 0);
        assert_eq!(
            engine.work_loop(&CountdownDeadline::new(2), &mut Tracer::none()),
            Ok(WorkStatus::Yielded)
        );
        engine.render(h("p"), 0);
        assert!(engine.store().live_count() <= 1, "old walk freed");
        let summary = run(&mut engine);
        assert_eq!(summary.cycle, 2);
        assert_eq!(summary.placements, 1);
    }

    fn counter_tree(slot: &Rc<RefCell<Option<Setter<i32>>>>) -> Element {
        let slot = Rc::clone(slot);
        component(move |_: &Props, hooks: &mut Hooks<'_>| -> Result<Element, HookError> {
            let (count, set) = hooks.use_state(0_i32)?;
            *slot.borrow_mut() = Some(set);
            Ok(h("b").child(count).build())
        })
        .build()
    }

    #[test]
    fn setter_restarts_from_current_root() {
        let requests = Rc::new(Cell::new(0_u32));
        let slot = Rc::new(RefCell::new(None));
        let mut engine = engine();
        let counter = Rc::clone(&requests);
        engine.set_idle_scheduler(move || counter.set(counter.get() + 1));

        engine.render(counter_tree(&slot), 0);
        assert_eq!(requests.get(), 1);
        run(&mut engine);
        assert!(!engine.has_pending_work());

        let set = slot.borrow().clone().unwrap();
        set.update(|c| c + 1);
        set.update(|c| c + 1);
        assert_eq!(requests.get(), 2, "updates coalesce into one request");
        assert!(engine.has_pending_work());
        engine.host_mut().ops.clear();

        let summary = run(&mut engine);
        assert_eq!(summary.cause, Some(CycleCause::StateUpdate));
        assert_eq!(summary.changed_updates, 1);
        assert_eq!(engine.host().ops, vec![String::from("set 2 nodeValue=2")]);
        assert_eq!(set.pending(), 0);
    }

    #[test]
    fn failed_commit_keeps_queued_updates() {
        let slot = Rc::new(RefCell::new(None));
        let mut engine = engine();
        engine.render(counter_tree(&slot), 0);
        run(&mut engine);
        let set = slot.borrow().clone().unwrap();

        // The component commits before its text node, whose update fails.
        set.update(|c| c + 1);
        engine.host_mut().fail_on_set = true;
        let err = engine.work_loop(&Unbounded, &mut Tracer::none());
        assert_eq!(err, Err(RenderError::Host("set refused")));
        assert_eq!(set.pending(), 1, "update survives the failed commit");

        engine.host_mut().fail_on_set = false;
        engine.host_mut().ops.clear();
        set.update(|c| c + 1);
        run(&mut engine);
        assert_eq!(engine.host().ops, vec![String::from("set 2 nodeValue=2")]);
        assert_eq!(set.pending(), 0);
    }

    #[test]
    fn swapped_fn_pointer_components_remount() {
        fn forty_one(_: &Props, hooks: &mut Hooks<'_>) -> Result<Element, HookError> {
            let (n, _) = hooks.use_state(41_i32)?;
            Ok(h("p").child(n).build())
        }
        fn seven(_: &Props, hooks: &mut Hooks<'_>) -> Result<Element, HookError> {
            let (n, _) = hooks.use_state(7_i32)?;
            Ok(h("p").child(n).build())
        }

        let mut engine = engine();
        engine.render(component(forty_one as RenderPtr), 0);
        run(&mut engine);
        engine.host_mut().ops.clear();

        engine.render(component(seven as RenderPtr), 0);
        let summary = run(&mut engine);
        assert_eq!(summary.deletions, 1);
        assert_eq!(summary.placements, 3, "component, <p> and its text");
        assert!(
            engine.host().ops.contains(&String::from("set 4 nodeValue=7")),
            "{:?}",
            engine.host().ops
        );
    }

    #[test]
    fn hook_error_is_reported_and_tree_kept() {
        let flip = Rc::new(Cell::new(false));
        let f = Rc::clone(&flip);
        let app = move || {
            let f = Rc::clone(&f);
            component(move |_: &Props, hooks: &mut Hooks<'_>| -> Result<Element, HookError> {
                hooks.use_state(0_u8)?;
                if f.get() {
                    hooks.use_state(0_u8)?;
                }
                Ok(text("x"))
            })
            .build()
        };
        let mut engine = engine();
        engine.render(app(), 0);
        run(&mut engine);
        let committed = engine.current_root();

        flip.set(true);
        engine.render(app(), 0);
        let err = engine.work_loop(&Unbounded, &mut Tracer::none()).unwrap_err();
        assert!(matches!(
            err,
            RenderError::Hook(HookError::UnstableOrder {
                previous: 1,
                current: 2,
                ..
            })
        ));
        assert_eq!(engine.current_root(), committed);
    }
}
