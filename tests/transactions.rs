use spark_observer::{
    autorun, computed, observable, observe_render, transaction, ObserverOptions, TestRenderer,
};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[test]
fn test_component_sees_only_post_transaction_state() {
    let a = observable(2);
    let loaded = observable(false);
    let values_seen = Rc::new(RefCell::new(Vec::new()));
    let renderer = TestRenderer::new();

    let (a_clone, loaded_clone, seen) = (a.clone(), loaded.clone(), values_seen.clone());
    let id = renderer.render(move |cx| {
        observe_render(
            cx,
            || {
                seen.borrow_mut().push(a_clone.get());
                if loaded_clone.get() {
                    format!("<div>{}</div>", a_clone.get())
                } else {
                    "<div>loading</div>".to_string()
                }
            },
            &ObserverOptions::new(),
        )
    });

    transaction(|| {
        a.set(3);
        a.set(4);
        loaded.set(true);
    });

    assert_eq!(renderer.output(id).unwrap(), "<div>4</div>");
    assert_eq!(*values_seen.borrow(), vec![2, 4], "intermediate values must not be rendered");
    assert_eq!(renderer.render_count(id).unwrap(), 2);
}

#[test]
fn test_autorun_computed_and_component_agree_after_transaction() {
    let a = observable(true);
    let b = observable(false);
    let b_clone = b.clone();
    let c = computed(move || b_clone.get());

    let as_text = Rc::new(RefCell::new(String::new()));
    let (a1, b1, c1, text) = (a.clone(), b.clone(), c.clone(), as_text.clone());
    let _dispose = autorun(move || {
        *text.borrow_mut() = format!("{}:{}:{}", a1.get(), b1.get(), c1.get());
    });

    let render_count = Rc::new(Cell::new(0));
    let renderer = TestRenderer::new();
    let (a2, b2, c2, count) = (a.clone(), b.clone(), c.clone(), render_count.clone());
    let id = renderer.render(move |cx| {
        observe_render(
            cx,
            || {
                count.set(count.get() + 1);
                format!("{},{},{}", a2.get(), b2.get(), c2.get())
            },
            &ObserverOptions::new(),
        )
    });

    transaction(|| {
        a.set(!a.get());
        b.set(!b.get());
    });

    assert_eq!(*as_text.borrow(), "false:true:true");
    assert_eq!(renderer.output(id).unwrap(), "false,true,true");
    assert_eq!(render_count.get(), 2);
}

#[test]
fn test_lone_write_is_its_own_transaction() {
    let value = observable(0);
    let renderer = TestRenderer::new();

    let value_clone = value.clone();
    let id = renderer.render(move |cx| {
        observe_render(cx, || format!("<div>{}</div>", value_clone.get()), &ObserverOptions::new())
    });
    assert_eq!(renderer.output(id).unwrap(), "<div>0</div>");

    value.set(1);

    assert_eq!(renderer.output(id).unwrap(), "<div>1</div>");
    assert_eq!(renderer.render_count(id).unwrap(), 2);
}

#[test]
fn test_equal_write_does_not_rerender() {
    let value = observable(5);
    let renderer = TestRenderer::new();

    let value_clone = value.clone();
    let id = renderer.render(move |cx| {
        observe_render(cx, || value_clone.get().to_string(), &ObserverOptions::new())
    });

    value.set(5);
    assert_eq!(renderer.render_count(id).unwrap(), 1);
}

#[test]
fn test_nested_transactions_render_once_at_the_end() {
    let value = observable(0);
    let renderer = TestRenderer::new();

    let value_clone = value.clone();
    let id = renderer.render(move |cx| {
        observe_render(cx, || value_clone.get().to_string(), &ObserverOptions::new())
    });

    transaction(|| {
        value.set(1);
        transaction(|| value.set(2));
        assert_eq!(renderer.render_count(id).unwrap(), 1, "no render inside the transaction");
        value.set(3);
    });

    assert_eq!(renderer.output(id).unwrap(), "3");
    assert_eq!(renderer.render_count(id).unwrap(), 2);
}
