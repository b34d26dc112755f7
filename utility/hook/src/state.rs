use std::{cell::RefCell, rc::Rc};

use crate::*;

/// Handle to a state slot created by [`LifecycleCxLike::use_state`]. Writing
/// through it requests a new render of the owning instance; the new value is
/// observed by that render.
pub struct StateSetter<T> {
  value: Rc<RefCell<T>>,
  trigger: UpdateTrigger,
}

impl<T> Clone for StateSetter<T> {
  fn clone(&self) -> Self {
    Self {
      value: self.value.clone(),
      trigger: self.trigger.clone(),
    }
  }
}

impl<T> StateSetter<T> {
  pub(crate) fn new(value: T, trigger: UpdateTrigger) -> Self {
    Self {
      value: Rc::new(RefCell::new(value)),
      trigger,
    }
  }

  pub fn set(&self, value: T) {
    *self.value.borrow_mut() = value;
    self.trigger.request();
  }

  pub fn update(&self, f: impl FnOnce(&mut T)) {
    f(&mut self.value.borrow_mut());
    self.trigger.request();
  }

  pub fn get(&self) -> T
  where
    T: Clone,
  {
    self.value.borrow().clone()
  }
}
