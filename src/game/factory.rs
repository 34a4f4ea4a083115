//! Entity factory: node placement and disaster rolls

use crate::game::action::Disaster;
use crate::game::constants::{node, view, DISASTERS};
use crate::game::state::{Node, NodeId};
use crate::util::random::RandomSource;
use crate::util::vec2::Vec2;

/// Random point inside the node band.
///
/// x keeps the whole node on screen; y stays two radii clear of the top edge
/// and of the ticker banner.
pub fn random_node_position(rng: &mut dyn RandomSource) -> Vec2 {
    let x = rng.range_f32(node::RADIUS, view::WIDTH - node::RADIUS);
    let y = rng.range_f32(
        node::RADIUS * 2.0,
        view::HEIGHT - view::BANNER_HEIGHT - node::RADIUS * 2.0,
    );
    Vec2::new(x, y)
}

/// Create an alive node, avoiding overlap with existing alive nodes when possible
pub fn make_node(id: NodeId, rng: &mut dyn RandomSource, existing: &[Node]) -> Node {
    let min_spacing = node::RADIUS * 2.0;
    let mut position = random_node_position(rng);

    for _ in 1..node::MAX_PLACEMENT_ATTEMPTS {
        let is_clear = existing
            .iter()
            .filter(|n| n.alive)
            .all(|n| n.position.distance_to(position) >= min_spacing);
        if is_clear {
            break;
        }
        position = random_node_position(rng);
    }

    Node::new(id, position)
}

/// The starting network
pub fn initial_nodes(rng: &mut dyn RandomSource) -> Vec<Node> {
    let mut nodes = Vec::with_capacity(node::INITIAL_COUNT);
    for id in 0..node::INITIAL_COUNT as NodeId {
        let n = make_node(id, rng, &nodes);
        nodes.push(n);
    }
    nodes
}

/// Roll a disaster from the catalogue at a random epicenter.
///
/// The epicenter's y leaves room for the full radius above the banner so the
/// splash stays visible.
pub fn random_disaster(rng: &mut dyn RandomSource) -> Disaster {
    let kind = DISASTERS[rng.index(DISASTERS.len())];
    let x = rng.range_f32(0.0, view::WIDTH);
    let y = rng.range_f32(0.0, view::HEIGHT - view::BANNER_HEIGHT - kind.radius);

    Disaster {
        name: kind.name.to_string(),
        center: Vec2::new(x, y),
        radius: kind.radius,
        color: kind.color.to_string(),
    }
}
