use std::fmt;

use crate::*;

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("The tracked value of a fixed callback has to be callable")]
pub struct InvalidCallbackError;

pub type CallResult<F, Args> = Result<<F as MaybeCallable<Args>>::Output, InvalidCallbackError>;

/// A tracked value that may or may not be callable at the moment it is invoked.
///
/// Every `Fn(Args) -> R` is callable, `Option<F>` is callable when `Some`.
/// Multiple arguments are passed as a tuple.
pub trait MaybeCallable<Args> {
  type Output;
  /// `None` if `self` is not callable
  fn invoke(&self, args: Args) -> Option<Self::Output>;
}

impl<Args, R, F> MaybeCallable<Args> for F
where
  F: Fn(Args) -> R,
{
  type Output = R;
  fn invoke(&self, args: Args) -> Option<R> {
    Some(self(args))
  }
}

impl<Args, R, F> MaybeCallable<Args> for Option<F>
where
  F: Fn(Args) -> R,
{
  type Output = R;
  fn invoke(&self, args: Args) -> Option<R> {
    self.as_ref().map(|f| f(args))
  }
}

/// Callback returned by [`use_fixed_callback`]. Its identity is fixed for the
/// instance lifetime while calls always reach the latest tracked function.
pub struct FixedCallback<F> {
  getter: FixedGetter<F>,
}

impl<F> Clone for FixedCallback<F> {
  fn clone(&self) -> Self {
    Self {
      getter: self.getter.clone(),
    }
  }
}

impl<F> PartialEq for FixedCallback<F> {
  fn eq(&self, other: &Self) -> bool {
    Self::ptr_eq(self, other)
  }
}
impl<F> Eq for FixedCallback<F> {}

impl<F> fmt::Debug for FixedCallback<F> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_tuple("FixedCallback")
      .field(&self.getter.as_ptr())
      .finish()
  }
}

impl<F> FixedCallback<F> {
  pub fn ptr_eq(a: &Self, b: &Self) -> bool {
    FixedGetter::ptr_eq(&a.getter, &b.getter)
  }

  /// Invoke the function of the last committed render.
  pub fn call<Args>(&self, args: Args) -> CallResult<F, Args>
  where
    F: MaybeCallable<Args>,
  {
    // the cell borrow is released before the callee runs, it may re-enter
    let callback = self.getter.get_shared();
    <F as MaybeCallable<Args>>::invoke(&callback, args).ok_or(InvalidCallbackError)
  }

  /// Invoke the function of the latest render, including the one in progress.
  pub fn call_at_render<Args>(&self, args: Args) -> CallResult<F, Args>
  where
    F: MaybeCallable<Args>,
  {
    let callback = self.getter.get_shared_at_render();
    <F as MaybeCallable<Args>>::invoke(&callback, args).ok_or(InvalidCallbackError)
  }
}

/// Wrap `callback`, usually a closure recreated every render, into a callback
/// that can be handed out once and still runs the latest closure.
///
/// `callback` may be non callable (`None`) on some renders; that is only an
/// error if the wrapper is invoked while such a value is tracked.
pub fn use_fixed_callback<Cx, F>(cx: &mut Cx, callback: F) -> FixedCallback<F>
where
  Cx: LifecycleCxLike,
  F: 'static,
{
  let getter = use_fixed_getter(cx, callback);
  let (_, callback) = cx.use_memo_once(|| FixedCallback { getter });
  callback.clone()
}

#[test]
fn test_maybe_callable() {
  let double = |x: u32| x * 2;
  assert_eq!(double.invoke(2), Some(4));
  assert_eq!(Some(double).invoke(3), Some(6));
  assert_eq!(None::<fn(u32) -> u32>.invoke(3), None);

  let add = |(a, b): (u32, u32)| a + b;
  assert_eq!(add.invoke((1, 2)), Some(3));
}
