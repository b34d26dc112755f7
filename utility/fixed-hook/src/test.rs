use std::{
  cell::{Cell, RefCell},
  rc::Rc,
};

use crate::*;

struct CounterGetter {
  counter: i32,
  set_counter: StateSetter<i32>,
  get_counter: FixedGetter<i32>,
}

fn use_counter_getter(cx: &mut RenderCx) -> CounterGetter {
  let (counter, set_counter) = cx.use_state(|| 0);
  let get_counter = use_fixed_getter(cx, counter);
  CounterGetter {
    counter,
    set_counter,
    get_counter,
  }
}

type Increment = Box<dyn Fn(i32)>;

struct CounterIncrement {
  counter: i32,
  set_counter: StateSetter<i32>,
  increment: FixedCallback<Increment>,
}

fn use_counter_increment(cx: &mut RenderCx) -> CounterIncrement {
  let (counter, set_counter) = cx.use_state(|| 0);
  let setter = set_counter.clone();
  let increment: Increment = Box::new(move |step: i32| setter.set(counter + step));
  let increment = use_fixed_callback(cx, increment);
  CounterIncrement {
    counter,
    set_counter,
    increment,
  }
}

#[test]
fn fixed_getter_keeps_reference() {
  let mut tester = HookTester::new(use_counter_getter);
  let getter = tester.current().get_counter.clone();

  for value in 1..10 {
    tester.act(|r| r.set_counter.set(value));
    assert_eq!(tester.current().counter, value);
    assert_eq!(tester.current().get_counter, getter);
  }
  tester.rerender();
  assert_eq!(tester.current().get_counter, getter);
}

#[test]
fn fixed_getter_returns_committed_value() {
  let mut tester = HookTester::new(use_counter_getter);
  let getter = tester.current().get_counter.clone();
  assert_eq!(getter.get(), 0);

  tester.act(|r| r.set_counter.set(10));
  assert_eq!(getter.get(), 10);

  tester.act(|r| r.set_counter.set(20));
  assert_eq!(tester.current().get_counter, getter);
  assert_eq!(getter.get(), 20);
}

#[test]
fn fixed_getter_returns_latest_value_in_render_phase() {
  let mut tester = HookTester::new(|cx| {
    let CounterGetter {
      counter,
      set_counter,
      get_counter,
    } = use_counter_getter(cx);
    let (cx, alternate) = cx.use_memo(counter, |_| get_counter.get_at_render() + 2);
    let alternate = *alternate;
    let (_, committed_alternate) = cx.use_memo(counter, |_| get_counter.get() + 2);
    (alternate, *committed_alternate, set_counter)
  });
  tester.rerender();

  tester.act(|(_, _, set_counter)| set_counter.set(20));
  assert_eq!(tester.current().0, 22);
  // the render producing 20 is not committed while the memo runs
  assert_eq!(tester.current().1, 2);
}

#[test]
fn fixed_getter_phases_before_commit() {
  let mut instance = ComponentInstance::default();

  let getter = instance.render(|cx| use_fixed_getter(cx, 1));
  assert_eq!(getter.get(), 1);
  assert_eq!(getter.get_at_render(), 1);
  instance.commit();

  let same = instance.render(|cx| use_fixed_getter(cx, 2));
  assert_eq!(same, getter);
  assert_eq!(getter.get(), 1);
  assert_eq!(getter.get_at_render(), 2);

  instance.discard();
  assert_eq!(getter.get(), 1);
  assert_eq!(getter.get_at_render(), 2);

  let same = instance.update(|cx| use_fixed_getter(cx, 3));
  assert_eq!(same, getter);
  assert_eq!(getter.get(), 3);
  assert_eq!(getter.get_at_render(), 3);
}

#[test]
fn fixed_getter_reads_are_idempotent() {
  let mut instance = ComponentInstance::default();
  let getter = instance.update(|cx| use_fixed_getter(cx, String::from("a")));
  instance.render(|cx| use_fixed_getter(cx, String::from("b")));

  for _ in 0..3 {
    assert_eq!(getter.get(), "a");
    assert_eq!(getter.get_at_render(), "b");
  }
  assert!(Rc::ptr_eq(&getter.get_shared(), &getter.get_shared()));
}

#[test]
fn fixed_getter_committed_before_passive_effects() {
  let seen = Rc::new(Cell::new(0));
  let mut instance = ComponentInstance::default();

  for value in [1, 2, 3] {
    let seen_in_effect = seen.clone();
    instance.update(move |cx| {
      let getter = Rc::new(RefCell::new(None::<FixedGetter<i32>>));
      let g = getter.clone();
      // registered before the getter's layout effect, still runs after it
      cx.use_effect(move || {
        if let Some(g) = g.borrow().as_ref() {
          seen_in_effect.set(g.get());
        }
      });
      *getter.borrow_mut() = Some(use_fixed_getter(cx, value));
    });
    assert_eq!(seen.get(), value);
  }
}

#[test]
fn fixed_getter_per_instance() {
  let mut instance = ComponentInstance::default();
  let render = |instance: &mut ComponentInstance| {
    instance.update(|cx| {
      let a = cx.scope(|cx| use_fixed_getter(cx, 1));
      let b = cx.scope(|cx| use_fixed_getter(cx, 2));
      (a, b)
    })
  };

  let (a, b) = render(&mut instance);
  assert_ne!(a, b);
  let (a2, b2) = render(&mut instance);
  assert_eq!(a, a2);
  assert_eq!(b, b2);

  let mut other = ComponentInstance::default();
  let (c, _) = render(&mut other);
  assert_ne!(a, c);
}

#[test]
fn fixed_getter_released_with_instance() {
  let tracker = Rc::new(());
  let getter = {
    let mut instance = ComponentInstance::default();
    instance.update(|cx| use_fixed_getter(cx, tracker.clone()))
  };
  // only the handle keeps the cell now
  assert_eq!(Rc::strong_count(&tracker), 2);
  drop(getter);
  assert_eq!(Rc::strong_count(&tracker), 1);
}

#[test]
fn fixed_callback_keeps_reference() {
  let mut tester = HookTester::new(use_counter_increment);
  let callback = tester.current().increment.clone();

  tester.act(|r| r.set_counter.set(10));
  tester.rerender();

  assert_eq!(tester.current().counter, 10);
  assert_eq!(tester.current().increment, callback);
}

#[test]
fn fixed_callback_has_latest_values_in_scope() {
  let mut tester = HookTester::new(use_counter_increment);

  tester.act(|r| r.set_counter.set(10));
  tester.act(|r| r.increment.call(10)).unwrap();

  assert_eq!(tester.current().counter, 20);
}

#[test]
fn fixed_callback_handed_out_once() {
  let mut tester = HookTester::new(use_counter_increment);
  // a consumer that keeps the callback from the first render only
  let increment = tester.current().increment.clone();

  for _ in 0..3 {
    tester.act(|_| increment.call(5)).unwrap();
  }
  assert_eq!(tester.current().counter, 15);
}

#[test]
fn fixed_callback_fails_if_latest_value_is_not_callable() {
  let mut tester = HookTester::new(|cx| {
    let (add_none, set_add_none) = cx.use_state(|| false);
    let callback = use_fixed_callback(cx, (!add_none).then_some(|_: ()| ()));
    (callback, set_add_none)
  });
  assert_eq!(tester.current().0.call(()), Ok(()));

  tester.act(|(_, fail)| fail.set(true));
  assert_eq!(
    tester.act(|(callback, _)| callback.call(())),
    Err(InvalidCallbackError)
  );
  assert_eq!(tester.current().0.call_at_render(()), Err(InvalidCallbackError));
}

#[test]
fn fixed_callback_not_callable_and_never_called() {
  let mut tester = HookTester::new(|cx| {
    let (count, set_count) = cx.use_state(|| 0);
    let callback = use_fixed_callback(cx, None::<fn(u32) -> u32>);
    (count, set_count, callback)
  });
  tester.act(|(_, set_count, _)| set_count.set(1));
  tester.rerender();
  assert_eq!(tester.current().0, 1);
}

#[test]
fn fixed_callback_phases() {
  let mut tester = HookTester::new(|cx| {
    let (counter, set_counter) = cx.use_state(|| 0);
    let read = use_fixed_callback(cx, move |_: ()| counter);
    let at_render = read.call_at_render(()).unwrap();
    let at_commit = read.call(()).unwrap();
    (at_render, at_commit, set_counter)
  });
  assert_eq!(tester.current().0, 0);
  assert_eq!(tester.current().1, 0);

  tester.act(|(_, _, set_counter)| set_counter.set(5));
  assert_eq!(tester.current().0, 5);
  assert_eq!(tester.current().1, 0);

  tester.rerender();
  assert_eq!(tester.current().1, 5);
}

#[test]
fn fixed_callback_passes_result_through() {
  let mut instance = ComponentInstance::default();
  let parse = instance.update(|cx| use_fixed_callback(cx, |s: &'static str| s.parse::<u32>()));

  assert_eq!(parse.call("12"), Ok(Ok(12)));
  assert!(matches!(parse.call("x"), Ok(Err(_))));
}

#[test]
fn fixed_callback_reads_fixed_getter() {
  let mut tester = HookTester::new(|cx| {
    let CounterGetter {
      counter,
      set_counter,
      get_counter,
    } = use_counter_getter(cx);
    let setter = set_counter.clone();
    let double = use_fixed_callback(cx, move |_: ()| setter.set(get_counter.get() * 2));
    (counter, set_counter, double)
  });

  tester.act(|(_, set_counter, _)| set_counter.set(3));
  tester.act(|(_, _, double)| double.call(())).unwrap();
  assert_eq!(tester.current().0, 6);
}

type Countdown = Box<dyn Fn(u32) -> u32>;

#[test]
fn fixed_callback_may_reenter() {
  let tester = HookTester::new(|cx| {
    let (_, slot) =
      cx.use_plain_state(|| Rc::new(RefCell::new(None::<FixedCallback<Countdown>>)));
    let slot = slot.clone();
    let this = slot.clone();
    let countdown: Countdown = Box::new(move |n: u32| {
      if n == 0 {
        return 0;
      }
      let this = this.borrow().clone().unwrap();
      1 + this.call(n - 1).unwrap()
    });
    let countdown = use_fixed_callback(cx, countdown);
    *slot.borrow_mut() = Some(countdown.clone());
    countdown
  });

  assert_eq!(tester.current().call(3), Ok(3));
  assert_eq!(tester.current().call_at_render(5), Ok(5));
}
