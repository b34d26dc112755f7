use std::{cell::RefCell, fmt, rc::Rc};

use crate::*;

/// Latest values of one tracked value, owned by one component instance.
pub struct LatestValueCell<T> {
  commit_value: Rc<T>,
  render_value: Rc<T>,
}

impl<T> LatestValueCell<T> {
  /// both phases start from the initial value, so the commit phase reader is
  /// defined before the first commit
  pub fn new(initial: Rc<T>) -> Self {
    Self {
      commit_value: initial.clone(),
      render_value: initial,
    }
  }

  pub fn set_render_value(&mut self, value: Rc<T>) {
    self.render_value = value;
  }

  pub fn set_commit_value(&mut self, value: Rc<T>) {
    self.commit_value = value;
  }

  pub fn commit_value(&self) -> &Rc<T> {
    &self.commit_value
  }

  pub fn render_value(&self) -> &Rc<T> {
    &self.render_value
  }
}

/// Accessor returned by [`use_fixed_getter`]. Every render of the same
/// instance returns a clone of the same handle, `==` compares that identity
/// and never the tracked value.
pub struct FixedGetter<T> {
  cell: Rc<RefCell<LatestValueCell<T>>>,
}

impl<T> Clone for FixedGetter<T> {
  fn clone(&self) -> Self {
    Self {
      cell: self.cell.clone(),
    }
  }
}

impl<T> PartialEq for FixedGetter<T> {
  fn eq(&self, other: &Self) -> bool {
    Self::ptr_eq(self, other)
  }
}
impl<T> Eq for FixedGetter<T> {}

impl<T> fmt::Debug for FixedGetter<T> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("FixedGetter")
      .field(&self.as_ptr())
      .finish()
  }
}

impl<T> FixedGetter<T> {
  pub fn ptr_eq(a: &Self, b: &Self) -> bool {
    Rc::ptr_eq(&a.cell, &b.cell)
  }

  /// address of the shared cell, stable for the handle's identity
  pub fn as_ptr(&self) -> *const () {
    Rc::as_ptr(&self.cell) as *const ()
  }

  /// the value of the last committed render
  pub fn get_shared(&self) -> Rc<T> {
    self.cell.borrow().commit_value().clone()
  }

  /// the value of the latest render, including the one in progress
  pub fn get_shared_at_render(&self) -> Rc<T> {
    self.cell.borrow().render_value().clone()
  }

  pub fn get(&self) -> T
  where
    T: Clone,
  {
    T::clone(&self.get_shared())
  }

  pub fn get_at_render(&self) -> T
  where
    T: Clone,
  {
    T::clone(&self.get_shared_at_render())
  }
}

/// Track `value` behind a getter that keeps its identity across renders.
///
/// The render phase value is replaced immediately; the commit phase value is
/// replaced by a layout effect, so it only moves when this render commits.
pub fn use_fixed_getter<Cx, T>(cx: &mut Cx, value: T) -> FixedGetter<T>
where
  Cx: LifecycleCxLike,
  T: 'static,
{
  let value = Rc::new(value);

  let (cx, cell) =
    cx.use_plain_state(|| Rc::new(RefCell::new(LatestValueCell::new(value.clone()))));
  let cell = cell.clone();
  cell.borrow_mut().set_render_value(value.clone());

  let commit_cell = cell.clone();
  cx.use_layout_effect(move || commit_cell.borrow_mut().set_commit_value(value));

  let (_, getter) = cx.use_memo_once(|| FixedGetter { cell });
  getter.clone()
}

#[test]
fn test_cell_seeded_with_initial_value() {
  let mut cell = LatestValueCell::new(Rc::new(1));
  assert_eq!(**cell.commit_value(), 1);
  assert_eq!(**cell.render_value(), 1);

  cell.set_render_value(Rc::new(2));
  assert_eq!(**cell.commit_value(), 1);
  assert_eq!(**cell.render_value(), 2);

  cell.set_commit_value(Rc::new(2));
  assert_eq!(**cell.commit_value(), 2);
}
