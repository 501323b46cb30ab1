//! Ownership and lifecycle properties of node trees, through the public API.

use std::cell::Cell;
use std::rc::Rc;

use spark_flex::{reachable_from, stats, Config, LayoutError, Node, Size};

type TestNode = Node<String, ()>;

fn create(name: &str) -> TestNode {
    Node::new(name.to_string(), ()).unwrap()
}

fn names(node: &TestNode) -> Vec<String> {
    node.children().iter().map(|child| child.context()).collect()
}

#[test]
fn test_scenario_root_a_b() {
    let root = create("root");
    let a = create("a");
    let b = create("b");

    root.insert_child(&a, 0).unwrap();
    assert_eq!(root.child_count(), 1);
    assert_eq!(a.parent(), Some(root.clone()));

    assert!(root.insert_child(&a, 0).is_err());
    assert_eq!(root.child_count(), 1);

    root.set_children(&[b.clone()]).unwrap();
    assert!(a.parent().is_none());
    assert_eq!(root.child_count(), 1);
    assert_eq!(root.child(0), Some(b.clone()));
}

#[test]
fn test_single_parent() {
    let p1 = create("p1");
    let p2 = create("p2");
    let c = create("c");
    p1.insert_child(&c, 0).unwrap();

    assert!(matches!(p2.insert_child(&c, 0), Err(LayoutError::ChildHasParent { .. })));
    assert!(matches!(p2.set_children(&[c.clone()]), Err(LayoutError::ChildHasParent { .. })));

    assert_eq!(p2.child_count(), 0);
    assert_eq!(p1.child_count(), 1);
    assert_eq!(c.parent(), Some(p1.clone()));
}

#[test]
fn test_order_fidelity() {
    let n = create("n");
    let (a, b, c) = (create("a"), create("b"), create("c"));
    n.set_children(&[a.clone(), b.clone(), c.clone()]).unwrap();

    assert_eq!(n.child(0), Some(a));
    assert_eq!(n.child(1), Some(b));
    assert_eq!(n.child(2), Some(c));
    assert_eq!(n.child(3), None);
    assert_eq!(n.child_count(), 3);
}

#[test]
fn test_insert_remove_inverse() {
    let n = create("n");
    n.set_children(&[create("a"), create("b"), create("c")]).unwrap();
    let before = names(&n);

    let x = create("x");
    n.insert_child(&x, 1).unwrap();
    assert_eq!(names(&n), vec!["a", "x", "b", "c"]);

    n.remove_child(&x).unwrap();
    assert_eq!(names(&n), before);
    assert_eq!(n.child_count(), 3);
    assert!(x.parent().is_none());
}

#[test]
fn test_measure_guard() {
    let n = create("n");
    n.set_measure_func(|_, _| Size { width: 5.0, height: 1.0 }).unwrap();
    let x = create("x");

    assert!(matches!(n.insert_child(&x, 0), Err(LayoutError::MeasureFuncAttached { .. })));
    assert!(matches!(n.set_children(&[x.clone()]), Err(LayoutError::MeasureFuncAttached { .. })));
    assert_eq!(n.child_count(), 0);
    assert!(x.parent().is_none());
}

#[test]
fn test_swap_tolerance() {
    let n = create("n");
    n.set_children(&[create("a"), create("b")]).unwrap();
    let x = create("x");

    n.swap_child(&x, 2).unwrap();
    n.swap_child(&x, 100).unwrap();

    assert_eq!(names(&n), vec!["a", "b"]);
    assert!(x.parent().is_none());
    assert_eq!(x.context(), "x");
}

#[test]
fn test_swap_then_set_children_elsewhere_is_rejected() {
    let root = create("root");
    let other = create("other");
    let (a, x) = (create("a"), create("x"));
    root.insert_child(&a, 0).unwrap();
    root.swap_child(&x, 0).unwrap();

    assert!(matches!(other.set_children(&[x.clone()]), Err(LayoutError::ChildHasParent { .. })));
    assert_eq!(other.child_count(), 0);
    assert_eq!(root.child_count(), 1);
    assert_eq!(names(&root), vec!["x"]);
}

#[test]
fn test_measure_closure_handles_are_freed() {
    let before = stats();
    {
        let leaf = create("leaf");
        let captured = create("captured");
        leaf.set_measure_func(move |_, _| {
            let _ = captured.native_id();
            Size::ZERO
        })
        .unwrap();
    }
    let after = stats();
    assert_eq!(after.nodes.live, before.nodes.live);
    assert_eq!(after.configs.live, before.configs.live);
    assert_eq!(Config::<()>::instance_count(), after.configs.live);
}

#[test]
fn test_remove_all_clears_back_references() {
    let n = create("n");
    let kids: Vec<TestNode> = (0..5).map(|i| create(&format!("k{i}"))).collect();
    n.set_children(&kids).unwrap();

    n.remove_all_children().unwrap();
    assert_eq!(n.child_count(), 0);
    for kid in &kids {
        assert!(kid.parent().is_none());
    }
}

#[test]
fn test_released_root_reclaims_tree() {
    let before = stats();
    let finalized = Rc::new(Cell::new(0));

    {
        let root = create("root");
        let mid = create("mid");
        root.insert_child(&mid, 0).unwrap();
        mid.set_children(&[create("leaf0"), create("leaf1")]).unwrap();

        let counter = finalized.clone();
        spark_flex::on_finalize(spark_flex::HandleClass::Node, move || counter.set(counter.get() + 1));
    }

    assert_eq!(finalized.get(), 4);
    let after = stats();
    assert_eq!(after.nodes.live, before.nodes.live);
    assert_eq!(after.configs.live, before.configs.live);
    spark_flex::tree::lifecycle::clear_finalize_hooks();
}

#[test]
fn test_external_child_survives_parent() {
    let child = create("child");
    {
        let root = create("root");
        root.insert_child(&child, 0).unwrap();
    }
    assert!(child.parent().is_none());
    assert_eq!(child.context(), "child");
    assert_eq!(child.child_count(), 0);
}

#[test]
fn test_trace_from_child_never_reaches_parent() {
    let root = create("root");
    let child = create("child");
    let grandchild = create("grandchild");
    root.insert_child(&child, 0).unwrap();
    child.insert_child(&grandchild, 0).unwrap();

    let reached = reachable_from(&child);
    assert!(reached.contains_node(&child));
    assert!(reached.contains_node(&grandchild));
    assert!(!reached.contains_node(&root));
}

#[test]
fn test_config_copy_keeps_identity() {
    let shared = Config::new(String::from("dst"));
    let node: Node<(), String> = Node::with_config((), &shared).unwrap();
    let src = Config::new(String::from("src"));
    src.set_point_scale_factor(2.0);

    shared.copy(&src);

    assert_eq!(node.config(), shared);
    assert_eq!(node.config().context(), "src");
    assert_eq!(node.config().point_scale_factor(), 2.0);
    assert_ne!(shared, src);
}

#[test]
fn test_failed_set_children_keeps_previous() {
    let n = create("n");
    let (a, b) = (create("a"), create("b"));
    n.set_children(&[a.clone(), b.clone()]).unwrap();

    let fresh = create("fresh");
    assert!(matches!(n.set_children(&[fresh.clone(), fresh.clone()]), Err(LayoutError::DuplicateChild)));
    assert!(matches!(n.set_children(&[fresh.clone(), a.clone()]), Err(LayoutError::ChildHasParent { .. })));

    assert_eq!(names(&n), vec!["a", "b"]);
    assert_eq!(a.parent(), Some(n.clone()));
    assert!(fresh.parent().is_none());
}

#[test]
fn test_payload_released_with_node() {
    let payload = Rc::new(42);
    let node: Node<Rc<i32>, ()> = Node::new(payload.clone(), ()).unwrap();
    assert_eq!(Rc::strong_count(&payload), 2);

    drop(node);
    assert_eq!(Rc::strong_count(&payload), 1);
}
