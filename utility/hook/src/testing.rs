use crate::*;

/// re-render rounds allowed for one `act` before it's treated as an update loop
const MAX_UPDATE_ROUNDS: usize = 64;

/// Drives a hook function inside its own [`ComponentInstance`], the way a
/// host would: every update is a render followed by a commit.
pub struct HookTester<R> {
  instance: ComponentInstance,
  hook: Box<dyn FnMut(&mut RenderCx) -> R>,
  current: R,
}

impl<R> HookTester<R> {
  /// mount the hook, the first render is committed
  pub fn new(mut hook: impl FnMut(&mut RenderCx) -> R + 'static) -> Self {
    let mut instance = ComponentInstance::default();
    let current = instance.update(&mut hook);
    Self {
      instance,
      hook: Box::new(hook),
      current,
    }
  }

  /// output of the latest render, committed or not
  pub fn current(&self) -> &R {
    &self.current
  }

  pub fn instance(&self) -> &ComponentInstance {
    &self.instance
  }

  pub fn rerender(&mut self) {
    self.current = self.instance.update(&mut self.hook);
  }

  /// render without committing, leaving the commit to [`Self::commit`]
  pub fn render_uncommitted(&mut self) {
    self.current = self.instance.render(&mut self.hook);
  }

  pub fn commit(&mut self) {
    self.instance.commit();
  }

  /// run `f` against the latest output, then render and commit until no
  /// state change is pending
  pub fn act<T>(&mut self, f: impl FnOnce(&R) -> T) -> T {
    let r = f(&self.current);
    for _ in 0..MAX_UPDATE_ROUNDS {
      if !self.instance.take_update_request() {
        return r;
      }
      self.rerender();
    }
    panic!("state still changing after {MAX_UPDATE_ROUNDS} renders, update loop?");
  }
}

#[test]
fn test_act_renders_until_stable() {
  let mut tester = HookTester::new(|cx| {
    let (count, setter) = cx.use_state(|| 0);
    if count % 2 == 1 {
      // odd numbers are corrected in the following render
      setter.set(count + 1);
    }
    (count, setter)
  });
  assert_eq!(tester.current().0, 0);

  tester.act(|(_, setter)| setter.set(3));
  assert_eq!(tester.current().0, 4);
  assert_eq!(tester.instance().render_count(), 3);
  assert_eq!(tester.instance().commit_count(), 3);
}
