use super::*;
use crate::expr::Expr;

fn node(name: &str, internal: bool) -> Node {
    Node {
        name: name.to_string(),
        logic: Expr::literal(0.0),
        rate_up: Expr::literal(1.0),
        rate_down: Expr::literal(1.0),
        internal,
    }
}

fn small_model() -> Model {
    Model {
        nodes: vec![node("A", false), node("B", true), node("C", false)],
        constants: HashMap::new(),
        variables: HashMap::new(),
        initial_distribution: vec![],
    }
}

#[test]
fn node_index_matches_declaration_order() {
    let m = small_model();
    assert_eq!(m.node_index("A"), Some(0));
    assert_eq!(m.node_index("B"), Some(1));
    assert_eq!(m.node_index("C"), Some(2));
    assert_eq!(m.node_index("Z"), None);
}

#[test]
fn noninternals_mask_skips_internal_nodes() {
    let m = small_model();
    let mask = m.noninternals_mask();
    assert!(mask.is_set(0));
    assert!(!mask.is_set(1));
    assert!(mask.is_set(2));
}

#[test]
fn observable_count_excludes_internal() {
    let m = small_model();
    assert_eq!(m.observable_count(), 2);
}

#[test]
fn get_attribute_resolves_known_names() {
    let m = small_model();
    assert!(m.get_attribute("A", "logic").is_some());
    assert!(m.get_attribute("A", "rate_up").is_some());
    assert!(m.get_attribute("A", "rate_down").is_some());
    assert!(m.get_attribute("A", "nonsense").is_none());
    assert!(m.get_attribute("nonexistent", "logic").is_none());
}

#[test]
fn validate_rejects_too_many_observables() {
    let mut m = small_model();
    m.nodes = (0..21).map(|i| node(&format!("N{i}"), false)).collect();
    assert_eq!(m.validate(), Err(ConfigError::TooManyObservables(21)));
}

#[test]
fn validate_rejects_duplicate_names() {
    let mut m = small_model();
    m.nodes.push(node("A", true));
    assert_eq!(m.validate(), Err(ConfigError::DuplicateNode("A".to_string())));
}

#[test]
fn validate_rejects_unnormalized_distribution() {
    let mut m = small_model();
    m.initial_distribution = vec![InitialStateEntry {
        state: State::empty(3),
        probability: 0.4,
    }];
    assert_eq!(m.validate(), Err(ConfigError::ProbabilitiesDoNotSum(0.4)));
}

#[test]
fn validate_accepts_well_formed_model() {
    let mut m = small_model();
    m.initial_distribution = vec![InitialStateEntry {
        state: State::empty(3),
        probability: 1.0,
    }];
    assert_eq!(m.validate(), Ok(()));
}

#[test]
fn sample_initial_uses_cumulative_weights() {
    let mut m = small_model();
    let mut first = State::empty(3);
    first.set(0);
    let mut second = State::empty(3);
    second.set(2);
    m.initial_distribution = vec![
        InitialStateEntry { state: first, probability: 0.3 },
        InitialStateEntry { state: second, probability: 0.7 },
    ];
    assert_eq!(m.sample_initial(0.0), first);
    assert_eq!(m.sample_initial(0.29), first);
    assert_eq!(m.sample_initial(0.31), second);
    assert_eq!(m.sample_initial(0.999), second);
}
