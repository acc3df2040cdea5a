use std::collections::HashMap;
use std::time::Duration;

use lineage_layout::*;
use tracing_test::traced_test;

const FRAME: Duration = Duration::from_millis(16);

struct Box2 {
    id: &'static str,
    size: Option<Size>,
    rank: Rank,
}

impl LayoutNode for Box2 {
    fn id(&self) -> String {
        self.id.to_string()
    }
    fn size(&self) -> Option<Size> {
        self.size
    }
    fn rank(&self) -> Rank {
        self.rank
    }
}

fn table(id: &'static str, layer: usize) -> Box2 {
    Box2 {
        id,
        size: Some(Size::new(150.0 + id.len() as f64 * 4.0, 44.0)),
        rank: Rank::Layer(layer),
    }
}

fn dashboard(id: &'static str) -> Box2 {
    Box2 {
        id,
        size: Some(Size::new(170.0, 56.0)),
        rank: Rank::Terminal,
    }
}

fn run_for(controller: &mut ForceController, duration: Duration) {
    let mut elapsed = Duration::ZERO;
    while elapsed < duration {
        controller.tick(FRAME);
        elapsed += FRAME;
    }
}

fn links(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(s, t)| (s.to_string(), t.to_string()))
        .collect()
}

#[test]
fn test_new_node_settles_while_others_stay_frozen() {
    let config = ForceConfig {
        seed: Some(42),
        ..Default::default()
    };
    let mut controller = ForceController::new(config);
    let ids = ["a", "b", "c", "d", "e"];
    let five = links(&[("a", "b"), ("b", "c"), ("c", "d"), ("d", "e")]);
    controller.set_graph(ids.iter().map(|id| ForceBody::new(*id, 14.0)).collect(), five.clone());

    run_for(&mut controller, Duration::from_millis(4000));
    assert_eq!(controller.state(), FreezeState::Frozen);
    let frozen: HashMap<String, Position> = controller.positions().clone();

    let mut six = five;
    six.push(("e".to_string(), "f".to_string()));
    let mut bodies: Vec<ForceBody> = ids.iter().map(|id| ForceBody::new(*id, 14.0)).collect();
    bodies.push(ForceBody::new("f", 14.0));
    controller.set_graph(bodies, six);
    assert_eq!(controller.state(), FreezeState::Freezing);
    assert!(controller.is_new("f"));
    let seeded = controller.position("f").unwrap();

    // first half of the grace window
    run_for(&mut controller, Duration::from_millis(700));
    assert_eq!(controller.state(), FreezeState::Freezing);
    for id in ids {
        assert_eq!(controller.position(id), frozen.get(id).copied(), "{id} moved while frozen");
    }
    assert!(controller.position("f").unwrap().distance(&seeded) > 1e-6);

    run_for(&mut controller, Duration::from_millis(800));
    assert_eq!(controller.state(), FreezeState::Frozen);
    assert!(ids.iter().chain(["f"].iter()).all(|id| controller.is_pinned(id)));
    assert!(!controller.is_new("f"));

    let settled = controller.positions().clone();
    run_for(&mut controller, Duration::from_millis(500));
    assert_eq!(controller.positions(), &settled);
}

#[test]
fn test_reorganize_moves_frozen_nodes_again() {
    let mut controller = ForceController::new(ForceConfig {
        seed: Some(1),
        ..Default::default()
    });
    controller.set_graph(
        vec![ForceBody::new("a", 10.0), ForceBody::new("b", 10.0), ForceBody::new("c", 10.0)],
        links(&[("a", "b")]),
    );
    run_for(&mut controller, Duration::from_millis(4000));
    assert_eq!(controller.state(), FreezeState::Frozen);

    // drop a node far away, then reorganize so physics pulls it back
    controller.drag_start("c");
    controller.drag_to("c", Position::new(5000.0, 5000.0));
    controller.drag_end("c");
    controller.reorganize();
    assert_eq!(controller.state(), FreezeState::Settling);
    run_for(&mut controller, Duration::from_millis(200));

    let c = controller.position("c").unwrap();
    assert!(c.distance(&Position::new(5000.0, 5000.0)) > 1.0);
}

#[test]
fn test_positions_not_ready_until_tick() {
    let mut controller = ForceController::new(ForceConfig::default());
    controller.set_graph(vec![ForceBody::new("a", 10.0)], Vec::new());
    assert!(!controller.has_ticked());
    controller.tick(FRAME);
    assert!(controller.has_ticked());
    controller.set_graph(vec![ForceBody::new("a", 10.0), ForceBody::new("b", 10.0)], Vec::new());
    assert!(!controller.has_ticked());
}

#[test]
fn test_dashboards_render_rightmost() {
    let nodes = vec![
        table("raw_orders", 0),
        table("orders", 1),
        dashboard("sales"),
        table("orders_mart", 2),
        table("kpi", 3),
        dashboard("ops"),
    ];
    let edges = [(0, 1), (1, 3), (3, 4), (4, 2), (1, 5)];
    let result = hierarchical::layout(&nodes, &edges, &HierarchicalConfig::default());

    assert_eq!(result.nodes.len(), nodes.len());
    let max_table_x = ["raw_orders", "orders", "orders_mart", "kpi"]
        .iter()
        .map(|id| result.position_of(id).unwrap().x)
        .fold(f64::NEG_INFINITY, f64::max);
    for id in ["sales", "ops"] {
        assert!(result.position_of(id).unwrap().x > max_table_x);
        assert_eq!(result.column_of(id), Some(4));
    }
    assert!(result.position_of("raw_orders").unwrap().x < result.position_of("orders").unwrap().x);
}

#[test]
fn test_layout_is_repeatable() {
    let nodes = vec![
        table("a", 0),
        table("b", 0),
        table("c", 1),
        table("d", 2),
        dashboard("x"),
    ];
    let edges = [(0, 2), (1, 2), (2, 3), (3, 4)];
    let config = HierarchicalConfig::default();
    let first = hierarchical::layout(&nodes, &edges, &config);
    let second = hierarchical::layout(&nodes, &edges, &config);

    assert_eq!(first.strategy, second.strategy);
    for (a, b) in first.nodes.iter().zip(&second.nodes) {
        assert_eq!(a.id, b.id);
        assert_eq!(a.column, b.column);
    }
    let column_order = |result: &LayoutResult| {
        let mut ordered: Vec<(usize, f64, String)> = result
            .nodes
            .iter()
            .map(|n| (n.column, n.position.y, n.id.clone()))
            .collect();
        ordered.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        ordered.into_iter().map(|(_, _, id)| id).collect::<Vec<_>>()
    };
    assert_eq!(column_order(&first), column_order(&second));
}

#[test]
fn test_zero_dimension_node_uses_fallback() {
    let nodes = vec![
        table("a", 0),
        Box2 {
            id: "flat",
            size: Some(Size::new(0.0, 0.0)),
            rank: Rank::Layer(1),
        },
        dashboard("x"),
    ];
    let result = hierarchical::layout(&nodes, &[(0, 1), (1, 2)], &HierarchicalConfig::default());

    assert_eq!(result.strategy, LayoutStrategy::Fallback);
    assert_eq!(result.nodes.len(), 3);
    for id in ["a", "flat", "x"] {
        let p = result.position_of(id).unwrap();
        assert!(p.x.is_finite() && p.y.is_finite());
    }
    assert!(result.position_of("x").unwrap().x > result.position_of("flat").unwrap().x);
}

#[test]
#[traced_test]
fn test_fallback_is_logged() {
    let nodes = vec![Box2 {
        id: "unmeasured",
        size: None,
        rank: Rank::Layer(0),
    }];
    hierarchical::layout(&nodes, &[], &HierarchicalConfig::default());
    assert!(logs_contain("fell back to grouped grid"));
}

#[test]
fn test_top_left_is_center_minus_half_size() {
    let nodes = vec![table("only", 0)];
    let config = HierarchicalConfig::default();
    let result = hierarchical::layout(&nodes, &[], &config);
    let placed = &result.nodes[0];

    // a single node sits at the margin on both axes
    assert_eq!(placed.position.x, config.margin);
    assert_eq!(placed.position.y, config.margin);
}

#[test]
fn test_config_defaults_fill_missing_fields() {
    let force: ForceConfig = serde_json::from_str(r#"{ "link_distance": 42.0 }"#).unwrap();
    assert_eq!(force.link_distance, 42.0);
    assert_eq!(force.settle_duration_ms, 4000);
    assert_eq!(force.freeze_grace_ms, 1500);

    let hierarchical: HierarchicalConfig = serde_json::from_str(r#"{ "margin": 10.0 }"#).unwrap();
    assert_eq!(hierarchical.margin, 10.0);
    assert_eq!(hierarchical.min_rank_sep, HierarchicalConfig::default().min_rank_sep);
}
