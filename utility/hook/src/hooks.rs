use std::{
  any::{Any, TypeId},
  hash::BuildHasherDefault,
  panic::Location,
};

use bumpalo::Bump;
use hashbrown::HashMap;
use rustc_hash::FxHasher;

type ScopeMap<V> = HashMap<Location<'static>, V, BuildHasherDefault<FxHasher>>;

/// # Safety
///
/// The implementor must hand out the same [`FunctionMemory`] for the whole
/// execution of a render, and must not reset or drop it while any state
/// reference returned from [`HooksCxLike::use_plain_state`] is alive.
pub unsafe trait HooksCxLike: Sized {
  fn memory_mut(&mut self) -> &mut FunctionMemory;
  fn memory_ref(&self) -> &FunctionMemory;

  fn execute<R>(&mut self, f: impl FnOnce(&mut Self) -> R, rollback: bool) -> R {
    let start_cursor = self.memory_ref().current_cursor;
    let recorded = self.memory_ref().state_count();
    let r = f(self);

    let memory = self.memory_mut();
    if memory.hook_count_changed(recorded) {
      log::warn!(
        "hook count changed between renders: {} states recorded, {} visited",
        recorded,
        memory.current_cursor - start_cursor
      );
    }
    if rollback {
      memory.current_cursor = start_cursor;
    }

    memory.created = true;
    r
  }

  #[track_caller]
  fn raw_scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
    let sub_memory = self.memory_mut().sub_function() as *mut _;

    unsafe {
      core::ptr::swap(self.memory_mut(), sub_memory);
      let r = f(self);
      core::ptr::swap(self.memory_mut(), sub_memory);
      r
    }
  }

  /// run `f` with its own memory keyed by the caller location. the memory is kept
  /// as long as the scope is visited in every committed render.
  #[track_caller]
  fn scope<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
    self.raw_scope(|cx| cx.execute(|cx| f(cx), true))
  }

  fn use_plain_state<T: 'static>(&mut self, f: impl FnOnce() -> T) -> (&mut Self, &mut T) {
    let state = self.memory_mut().expect_state_init(f) as *mut T;
    // the state is allocated in the bump arena, its address is stable until the memory drops.
    (self, unsafe { &mut *state })
  }

  fn use_plain_state_default<T: 'static + Default>(&mut self) -> (&mut Self, &mut T) {
    self.use_plain_state(Default::default)
  }
  fn use_plain_state_default_cloned<T: 'static + Default + Clone>(&mut self) -> (&mut Self, T) {
    let (cx, r) = self.use_plain_state::<T>(Default::default);
    (cx, r.clone())
  }

  /// the value is recomputed only when `deps` differs from the one of the last render
  fn use_memo<D: PartialEq + 'static, T: 'static>(
    &mut self,
    deps: D,
    f: impl FnOnce(&D) -> T,
  ) -> (&mut Self, &mut T) {
    let (cx, slot) = self.use_plain_state::<Option<(D, T)>>(|| None);

    let stale = !matches!(slot, Some((previous, _)) if *previous == deps);
    if stale {
      *slot = None;
    }

    let (_, value) = slot.get_or_insert_with(|| {
      let value = f(&deps);
      (deps, value)
    });
    (cx, value)
  }

  /// created in the first render and never recomputed
  fn use_memo_once<T: 'static>(&mut self, f: impl FnOnce() -> T) -> (&mut Self, &mut T) {
    self.use_memo((), |_| f())
  }
}

struct FunctionMemoryState {
  ptr: *mut (),
  type_id: TypeId,
  type_name: &'static str,
  drop_fn: unsafe fn(*mut ()),
}

unsafe fn drop_state<T>(ptr: *mut ()) {
  core::ptr::drop_in_place(ptr as *mut T)
}

/// Hook states of one function (component instance), in call order.
#[derive(Default)]
pub struct FunctionMemory {
  pub created: bool,
  states: Bump,
  states_meta: Vec<FunctionMemoryState>,
  pub current_cursor: usize,
  sub_functions: ScopeMap<Self>,
  sub_functions_next: ScopeMap<Self>,
}

impl FunctionMemory {
  pub fn state_count(&self) -> usize {
    self.states_meta.len()
  }

  /// after a render, whether it visited a different number of states than the
  /// `recorded` ones existing before it. the first render records, never drifts.
  pub fn hook_count_changed(&self, recorded: usize) -> bool {
    self.created && self.current_cursor != recorded
  }

  pub fn expect_state_init<T: Any>(&mut self, init: impl FnOnce() -> T) -> &mut T {
    if self.states_meta.len() == self.current_cursor {
      let init = self.states.alloc_with(init);

      #[cfg(debug_assertions)]
      let type_name = std::any::type_name::<T>();

      #[cfg(not(debug_assertions))]
      let type_name = "";

      self.states_meta.push(FunctionMemoryState {
        ptr: init as *mut T as *mut (),
        type_id: TypeId::of::<T>(),
        type_name,
        drop_fn: drop_state::<T>,
      });
    }
    let FunctionMemoryState {
      type_id,
      ptr,
      type_name,
      ..
    } = &self.states_meta[self.current_cursor];
    let ptr = *ptr;

    if *type_id != TypeId::of::<T>() {
      log::error!(
        "hook state type mismatch at slot {}, expect: {}, stored: {}",
        self.current_cursor,
        std::any::type_name::<T>(),
        type_name
      );
      panic!("type_miss_match");
    }

    self.current_cursor += 1;
    unsafe { &mut *(ptr as *mut T) }
  }

  #[track_caller]
  pub fn sub_function(&mut self) -> &mut Self {
    let location = Location::caller();
    if let Some(previous_memory) = self.sub_functions.remove(location) {
      self
        .sub_functions_next
        .entry(*location)
        .or_insert(previous_memory)
    } else {
      self.sub_functions_next.entry(*location).or_default()
    }
  }

  pub fn sub_function_count(&self) -> usize {
    self.sub_functions.len()
  }

  /// called when a render is committed. sub functions not visited in that
  /// render are dropped with their states.
  pub fn flush(&mut self) {
    self.sub_functions.clear();
    std::mem::swap(&mut self.sub_functions, &mut self.sub_functions_next);
    for sub_function in self.sub_functions.values_mut() {
      sub_function.flush();
    }
  }

  /// called when a render is discarded, restore the visited sub functions
  /// so the next render finds them again.
  pub fn abandon(&mut self) {
    for (location, mut sub_function) in self.sub_functions_next.drain() {
      sub_function.abandon();
      self.sub_functions.insert(location, sub_function);
    }
    self.current_cursor = 0;
  }
}

impl Drop for FunctionMemory {
  fn drop(&mut self) {
    // bump never runs destructors, states are dropped here in creation order
    for meta in self.states_meta.drain(..) {
      unsafe { (meta.drop_fn)(meta.ptr) }
    }
  }
}

#[test]
fn test_plain_state_persist() {
  struct Cx<'a>(&'a mut FunctionMemory);
  unsafe impl HooksCxLike for Cx<'_> {
    fn memory_mut(&mut self) -> &mut FunctionMemory {
      self.0
    }
    fn memory_ref(&self) -> &FunctionMemory {
      self.0
    }
  }

  let mut memory = FunctionMemory::default();

  let run = |memory: &mut FunctionMemory| {
    let mut cx = Cx(memory);
    cx.execute(
      |cx| {
        let (cx, counter) = cx.use_plain_state(|| 0_u32);
        *counter += 1;
        let counter = *counter;
        let (_, name) = cx.use_plain_state(|| String::from("a"));
        name.push('b');
        (counter, name.clone())
      },
      true,
    )
  };

  assert_eq!(run(&mut memory), (1, String::from("ab")));
  assert_eq!(run(&mut memory), (2, String::from("abb")));
  assert_eq!(memory.state_count(), 2);
  assert_eq!(memory.current_cursor, 0);
}

#[test]
fn test_default_state_persist() {
  struct Cx<'a>(&'a mut FunctionMemory);
  unsafe impl HooksCxLike for Cx<'_> {
    fn memory_mut(&mut self) -> &mut FunctionMemory {
      self.0
    }
    fn memory_ref(&self) -> &FunctionMemory {
      self.0
    }
  }

  let mut memory = FunctionMemory::default();
  let run = |memory: &mut FunctionMemory| {
    Cx(memory).execute(
      |cx| {
        let (cx, items) = cx.use_plain_state_default::<Vec<u32>>();
        items.push(items.len() as u32);
        let len = items.len();
        let (_, snapshot) = cx.use_plain_state_default_cloned::<Vec<u32>>();
        (len, snapshot)
      },
      true,
    )
  };

  assert_eq!(run(&mut memory), (1, Vec::new()));
  assert_eq!(run(&mut memory), (2, Vec::new()));
  assert_eq!(run(&mut memory), (3, Vec::new()));
}

#[test]
fn test_hook_count_drift() {
  let mut memory = FunctionMemory::default();
  memory.expect_state_init(|| 0_u32);
  assert!(!memory.hook_count_changed(0));
  memory.created = true;
  memory.current_cursor = 0;

  // same hooks
  memory.expect_state_init(|| 0_u32);
  assert!(!memory.hook_count_changed(1));
  memory.current_cursor = 0;

  // one more hook appended at the end
  memory.expect_state_init(|| 0_u32);
  memory.expect_state_init(|| 0_u32);
  assert!(memory.hook_count_changed(1));
  memory.current_cursor = 0;

  // fewer hooks
  memory.expect_state_init(|| 0_u32);
  assert!(memory.hook_count_changed(2));
}

#[test]
fn test_memo_recompute_on_deps_change() {
  struct Cx<'a>(&'a mut FunctionMemory);
  unsafe impl HooksCxLike for Cx<'_> {
    fn memory_mut(&mut self) -> &mut FunctionMemory {
      self.0
    }
    fn memory_ref(&self) -> &FunctionMemory {
      self.0
    }
  }

  let mut memory = FunctionMemory::default();
  let mut computed = 0;

  let run = |memory: &mut FunctionMemory, deps: u32, computed: &mut u32| {
    Cx(memory).execute(
      |cx| {
        let (cx, v) = cx.use_memo(deps, |d| {
          *computed += 1;
          d * 2
        });
        let v = *v;
        let (_, once) = cx.use_memo_once(|| deps);
        (v, *once)
      },
      true,
    )
  };

  assert_eq!(run(&mut memory, 1, &mut computed), (2, 1));
  assert_eq!(run(&mut memory, 1, &mut computed), (2, 1));
  assert_eq!(computed, 1);
  assert_eq!(run(&mut memory, 3, &mut computed), (6, 1));
  assert_eq!(computed, 2);
}

#[test]
fn test_states_dropped_with_memory() {
  use std::rc::Rc;

  let tracker = Rc::new(());
  {
    let mut memory = FunctionMemory::default();
    let held = memory.expect_state_init(|| tracker.clone());
    assert_eq!(Rc::strong_count(held), 2);
  }
  assert_eq!(Rc::strong_count(&tracker), 1);
}

#[test]
#[should_panic(expected = "type_miss_match")]
fn test_hook_order_violation_panics() {
  let mut memory = FunctionMemory::default();
  memory.expect_state_init(|| 1_u32);
  memory.current_cursor = 0;
  memory.expect_state_init(|| 1_f32);
}
