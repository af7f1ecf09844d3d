//! Scene-graph traversal with transform accumulation.

use glam::Mat4;
use tracing::warn;

use crate::source::RawScene;

/// Visit every node reachable from `root` once, depth-first, parents before
/// children and children in declaration order.
///
/// Each node's world transform is `parent_world * local`, starting from
/// `parent_world` at the root. `visit` is called with the mesh index and the
/// world transform for every mesh a node references. Returns the number of
/// nodes visited.
///
/// Uses an explicit stack, so arbitrarily deep graphs do not grow the call
/// stack. Nodes reached a second time and out-of-range indices are skipped.
pub fn walk_scene(
    scene: &RawScene,
    root: usize,
    parent_world: Mat4,
    mut visit: impl FnMut(usize, Mat4),
) -> usize {
    let mut visited = vec![false; scene.nodes.len()];
    let mut stack = vec![(root, parent_world)];
    let mut count = 0;

    while let Some((index, parent_world)) = stack.pop() {
        let Some(node) = scene.nodes.get(index) else {
            warn!("Skipping reference to missing node {}", index);
            continue;
        };
        if std::mem::replace(&mut visited[index], true) {
            warn!("Node '{}' is referenced more than once, visiting it once", node.name);
            continue;
        }
        count += 1;

        let world = parent_world * node.transform;

        for &mesh in &node.meshes {
            if mesh < scene.meshes.len() {
                visit(mesh, world);
            } else {
                warn!("Node '{}' references missing mesh {}", node.name, mesh);
            }
        }

        stack.extend(node.children.iter().rev().map(|&child| (child, world)));
    }

    count
}
