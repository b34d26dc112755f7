use std::{cell::Cell, rc::Rc};

use smallvec::SmallVec;

use crate::*;

pub type Effect = Box<dyn FnOnce()>;

/// Effects registered by one render, waiting for its commit.
#[derive(Default)]
pub struct EffectQueue {
  layout: SmallVec<[Effect; 4]>,
  passive: SmallVec<[Effect; 4]>,
}

impl EffectQueue {
  pub fn clear(&mut self) {
    self.layout.clear();
    self.passive.clear();
  }

  /// layout effects run before passive ones, each group in registration order
  pub fn run(&mut self) {
    for effect in std::mem::take(&mut self.layout) {
      effect();
    }
    for effect in std::mem::take(&mut self.passive) {
      effect();
    }
  }
}

/// Shared flag raised by state setters when the instance should render again.
#[derive(Clone, Default)]
pub struct UpdateTrigger {
  requested: Rc<Cell<bool>>,
}

impl UpdateTrigger {
  pub fn request(&self) {
    self.requested.set(true);
  }

  pub fn take(&self) -> bool {
    self.requested.replace(false)
  }
}

pub trait LifecycleCxLike: HooksCxLike {
  /// runs synchronously when the current render is committed, before passive effects.
  fn use_layout_effect(&mut self, effect: impl FnOnce() + 'static);
  /// runs after all layout effects of the committed render.
  fn use_effect(&mut self, effect: impl FnOnce() + 'static);
  fn update_trigger(&self) -> UpdateTrigger;

  fn use_state<T: Clone + 'static>(&mut self, init: impl FnOnce() -> T) -> (T, StateSetter<T>) {
    let trigger = self.update_trigger();
    let (_, state) = self.use_plain_state(|| StateSetter::new(init(), trigger));
    (state.get(), state.clone())
  }
}

pub struct RenderCx<'a> {
  memory: &'a mut FunctionMemory,
  effects: &'a mut EffectQueue,
  trigger: &'a UpdateTrigger,
}

unsafe impl HooksCxLike for RenderCx<'_> {
  fn memory_mut(&mut self) -> &mut FunctionMemory {
    self.memory
  }

  fn memory_ref(&self) -> &FunctionMemory {
    self.memory
  }
}

impl LifecycleCxLike for RenderCx<'_> {
  fn use_layout_effect(&mut self, effect: impl FnOnce() + 'static) {
    self.effects.layout.push(Box::new(effect));
  }

  fn use_effect(&mut self, effect: impl FnOnce() + 'static) {
    self.effects.passive.push(Box::new(effect));
  }

  fn update_trigger(&self) -> UpdateTrigger {
    self.trigger.clone()
  }
}

/// One mounted component: its hook memory and the effects of its latest
/// uncommitted render. Dropping the instance drops all of its hook states.
#[derive(Default)]
pub struct ComponentInstance {
  memory: FunctionMemory,
  effects: EffectQueue,
  trigger: UpdateTrigger,
  pending_commit: bool,
  render_count: usize,
  commit_count: usize,
}

impl ComponentInstance {
  /// Run the render phase. Hook states are written immediately, effects wait
  /// for [`Self::commit`]. A previous render that was never committed is
  /// discarded first.
  pub fn render<R>(&mut self, f: impl FnOnce(&mut RenderCx) -> R) -> R {
    if self.pending_commit {
      self.discard();
    }

    self.render_count += 1;
    log::trace!("render #{}", self.render_count);

    let mut cx = RenderCx {
      memory: &mut self.memory,
      effects: &mut self.effects,
      trigger: &self.trigger,
    };
    let r = cx.execute(f, true);
    self.pending_commit = true;
    r
  }

  pub fn commit(&mut self) {
    if !self.pending_commit {
      log::warn!("commit requested but there is no pending render");
      return;
    }
    self.pending_commit = false;
    self.commit_count += 1;
    log::trace!("commit #{}", self.commit_count);

    self.memory.flush();
    self.effects.run();
  }

  /// Drop the pending render: its effects never run and child scopes it
  /// visited stay alive. Render phase writes to hook states are kept.
  pub fn discard(&mut self) {
    if !self.pending_commit {
      return;
    }
    log::debug!("discard render #{}", self.render_count);
    self.pending_commit = false;
    self.effects.clear();
    self.memory.abandon();
  }

  pub fn update<R>(&mut self, f: impl FnOnce(&mut RenderCx) -> R) -> R {
    let r = self.render(f);
    self.commit();
    r
  }

  pub fn has_pending_commit(&self) -> bool {
    self.pending_commit
  }

  /// returns true once for every batch of state changes since the last call
  pub fn take_update_request(&self) -> bool {
    self.trigger.take()
  }

  pub fn render_count(&self) -> usize {
    self.render_count
  }

  pub fn commit_count(&self) -> usize {
    self.commit_count
  }

  pub fn memory(&self) -> &FunctionMemory {
    &self.memory
  }
}

#[test]
fn test_effect_order() {
  use std::cell::RefCell;

  let log = Rc::new(RefCell::new(Vec::new()));
  let mut instance = ComponentInstance::default();

  let l = log.clone();
  instance.render(move |cx| {
    let l1 = l.clone();
    cx.use_effect(move || l1.borrow_mut().push("passive"));
    let l2 = l.clone();
    cx.use_layout_effect(move || l2.borrow_mut().push("layout a"));
    let l3 = l.clone();
    cx.use_layout_effect(move || l3.borrow_mut().push("layout b"));
    l.borrow_mut().push("render");
  });
  assert_eq!(*log.borrow(), vec!["render"]);

  instance.commit();
  assert_eq!(
    *log.borrow(),
    vec!["render", "layout a", "layout b", "passive"]
  );
  assert_eq!(instance.commit_count(), 1);
}

#[test]
fn test_discarded_render_effects_never_run() {
  let ran = Rc::new(Cell::new(0));
  let mut instance = ComponentInstance::default();

  let render = |instance: &mut ComponentInstance| {
    let ran = ran.clone();
    instance.render(move |cx| cx.use_layout_effect(move || ran.set(ran.get() + 1)));
  };

  render(&mut instance);
  render(&mut instance);
  assert!(instance.has_pending_commit());
  instance.commit();
  assert_eq!(ran.get(), 1);

  render(&mut instance);
  instance.discard();
  instance.commit();
  assert_eq!(ran.get(), 1);
  assert_eq!(instance.render_count(), 3);
  assert_eq!(instance.commit_count(), 1);
}

#[test]
fn test_state_request_update() {
  let mut instance = ComponentInstance::default();

  let (value, setter) = instance.update(|cx| cx.use_state(|| 1));
  assert_eq!(value, 1);
  assert!(!instance.take_update_request());

  setter.set(5);
  assert!(instance.take_update_request());
  assert!(!instance.take_update_request());

  let (value, _) = instance.update(|cx| cx.use_state(|| 1));
  assert_eq!(value, 5);

  setter.update(|v| *v += 1);
  assert_eq!(setter.get(), 6);
  assert!(instance.take_update_request());
  let (value, _) = instance.update(|cx| cx.use_state(|| 1));
  assert_eq!(value, 6);
}

#[test]
fn test_unvisited_scope_dropped_on_commit() {
  let tracker = Rc::new(());
  let mut instance = ComponentInstance::default();

  let render = |instance: &mut ComponentInstance, show: bool| {
    let tracker = tracker.clone();
    instance.render(move |cx| {
      if show {
        cx.scope(|cx| {
          cx.use_plain_state(|| tracker.clone());
        });
      }
    });
  };

  render(&mut instance, true);
  instance.commit();
  assert_eq!(Rc::strong_count(&tracker), 2);
  assert_eq!(instance.memory().sub_function_count(), 1);

  // a discarded render that skips the scope keeps it alive
  render(&mut instance, false);
  instance.discard();
  render(&mut instance, true);
  instance.commit();
  assert_eq!(Rc::strong_count(&tracker), 2);

  render(&mut instance, false);
  instance.commit();
  assert_eq!(Rc::strong_count(&tracker), 1);
  assert_eq!(instance.memory().sub_function_count(), 0);
}

#[test]
fn test_instance_teardown_drops_states() {
  let tracker = Rc::new(());
  {
    let mut instance = ComponentInstance::default();
    let t = tracker.clone();
    instance.update(move |cx| {
      cx.use_plain_state(|| t);
    });
    assert_eq!(Rc::strong_count(&tracker), 2);
  }
  assert_eq!(Rc::strong_count(&tracker), 1);
}
