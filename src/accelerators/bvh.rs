//! Bounding volume hierarchy over the scene's primitive list (one
//! primitive per sphere/plane entity, one per mesh triangle). Nodes are
//! built top-down with a surface-area-heuristic bucket split, then
//! flattened into a linear, cache-friendly array: the left child of an
//! interior node always sits at `self_index + 1`, so traversal only
//! needs to carry the second child's index.

use crate::core::geometry::{Bounds3, Bounds3f32, Point3f, Ray, Vector3f, XYZEnum};
use crate::core::interaction::SurfacePoint;
use crate::core::pbrt::Float;
use crate::core::scene::Primitive;

const MAX_PRIMS_IN_NODE: usize = 4;
const N_BUCKETS: usize = 12;
/// Traversal stack depth. The builder never recurses past this (each
/// split roughly halves the primitive count), so a depth-64 stack is a
/// generous upper bound rather than a tight one.
const MAX_STACK_DEPTH: usize = 64;

#[derive(Debug, Copy, Clone)]
struct PrimitiveInfo {
    index: usize,
    bounds: Bounds3,
    centroid: Point3f,
}

impl PrimitiveInfo {
    fn new(index: usize, bounds: Bounds3) -> Self {
        let centroid = bounds.centroid();
        PrimitiveInfo {
            index,
            bounds,
            centroid,
        }
    }
}

/// Temporary build-time tree node; collapsed into [`LinearBvhNode`] by
/// [`Bvh::flatten`].
enum BuildNode {
    Leaf {
        bounds: Bounds3,
        first_prim: u32,
        n_prims: u16,
    },
    Interior {
        bounds: Bounds3,
        axis: u8,
        left: Box<BuildNode>,
        right: Box<BuildNode>,
    },
}

/// Compact 32-byte linear BVH node: 6×`f32` bounds, a `u32` that is
/// either the first-primitive offset (leaf) or the second child's index
/// (interior), a `u16` that is either the leaf primitive count or the
/// split axis, and a `u16` interior/leaf flag.
#[derive(Debug, Copy, Clone)]
#[repr(C)]
pub struct LinearBvhNode {
    pub bounds: Bounds3f32,
    pub offset: u32,
    pub count_or_axis: u16,
    pub is_interior: u16,
}

/// Bounding volume hierarchy over a scene's flattened primitive list.
/// Built once at load and read concurrently by every render worker.
pub struct Bvh {
    nodes: Vec<LinearBvhNode>,
    /// Primitives reordered so every leaf's primitives are contiguous.
    ordered: Vec<Primitive>,
}

impl Bvh {
    pub fn build(primitives: Vec<Primitive>) -> Self {
        if primitives.is_empty() {
            return Bvh {
                nodes: vec![LinearBvhNode {
                    bounds: Bounds3f32::from(Bounds3::default()),
                    offset: 0,
                    count_or_axis: 0,
                    is_interior: 0,
                }],
                ordered: Vec::new(),
            };
        }

        let mut infos: Vec<PrimitiveInfo> = primitives
            .iter()
            .enumerate()
            .map(|(i, p)| PrimitiveInfo::new(i, p.world_bounds()))
            .collect();

        let mut ordered = Vec::with_capacity(primitives.len());
        let root = Self::recursive_build(&mut infos, &primitives, &mut ordered, 0);

        let mut nodes = Vec::new();
        Self::flatten(&root, &mut nodes);

        Bvh { nodes, ordered }
    }

    fn recursive_build(
        infos: &mut [PrimitiveInfo],
        primitives: &[Primitive],
        ordered: &mut Vec<Primitive>,
        depth: usize,
    ) -> BuildNode {
        debug_assert!(depth < MAX_STACK_DEPTH, "BVH builder exceeded max depth");

        let mut bounds = Bounds3::default();
        for info in infos.iter() {
            bounds = bounds.union(&info.bounds);
        }

        if infos.len() <= 2 {
            return Self::make_leaf(infos, primitives, ordered, bounds);
        }

        let mut centroid_bounds = Bounds3::default();
        for info in infos.iter() {
            centroid_bounds = centroid_bounds.union_point(info.centroid);
        }
        let axis = centroid_bounds.maximum_extent();
        let extent = centroid_bounds.diagonal();
        let axis_extent = centroid_component(&extent, axis);

        if axis_extent < 1e-12 {
            if infos.len() <= MAX_PRIMS_IN_NODE {
                return Self::make_leaf(infos, primitives, ordered, bounds);
            }
            // Degenerate centroids (coincident primitives): split by
            // count rather than by a SAH bucket that can't discriminate.
            let mid = infos.len() / 2;
            infos.select_nth_unstable_by(mid, |a, b| {
                centroid_component(&a.centroid, axis)
                    .partial_cmp(&centroid_component(&b.centroid, axis))
                    .unwrap()
            });
            let (left_infos, right_infos) = infos.split_at_mut(mid);
            let left = Self::recursive_build(left_infos, primitives, ordered, depth + 1);
            let right = Self::recursive_build(right_infos, primitives, ordered, depth + 1);
            return BuildNode::Interior {
                bounds,
                axis: axis as u8,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        let min_c = centroid_component(&centroid_bounds.p_min, axis);
        let bucket_of = |c: Float| -> usize {
            let b = (N_BUCKETS as Float * (c - min_c) / axis_extent) as usize;
            b.min(N_BUCKETS - 1)
        };

        let mut bucket_count = [0usize; N_BUCKETS];
        let mut bucket_bounds = [Bounds3::default(); N_BUCKETS];
        for info in infos.iter() {
            let b = bucket_of(centroid_component(&info.centroid, axis));
            bucket_count[b] += 1;
            bucket_bounds[b] = bucket_bounds[b].union(&info.bounds);
        }

        let mut best_cost = Float::INFINITY;
        let mut best_split = 0usize;
        for split in 0..N_BUCKETS - 1 {
            let mut b0 = Bounds3::default();
            let mut n0 = 0usize;
            for i in 0..=split {
                if bucket_count[i] > 0 {
                    b0 = b0.union(&bucket_bounds[i]);
                }
                n0 += bucket_count[i];
            }
            let mut b1 = Bounds3::default();
            let mut n1 = 0usize;
            for i in split + 1..N_BUCKETS {
                if bucket_count[i] > 0 {
                    b1 = b1.union(&bucket_bounds[i]);
                }
                n1 += bucket_count[i];
            }
            if n0 == 0 || n1 == 0 {
                continue;
            }
            let cost = 0.125
                + (n0 as Float * b0.surface_area() + n1 as Float * b1.surface_area())
                    / bounds.surface_area().max(1e-12);
            if cost < best_cost {
                best_cost = cost;
                best_split = split;
            }
        }

        let leaf_cost = infos.len() as Float;
        if infos.len() > MAX_PRIMS_IN_NODE || best_cost < leaf_cost {
            infos.sort_by_key(|info| bucket_of(centroid_component(&info.centroid, axis)));
            let split_count: usize = bucket_count.iter().take(best_split + 1).sum();
            let (left_infos, right_infos) = infos.split_at_mut(split_count);
            if left_infos.is_empty() || right_infos.is_empty() {
                return Self::make_leaf(infos, primitives, ordered, bounds);
            }
            let left = Self::recursive_build(left_infos, primitives, ordered, depth + 1);
            let right = Self::recursive_build(right_infos, primitives, ordered, depth + 1);
            BuildNode::Interior {
                bounds,
                axis: axis as u8,
                left: Box::new(left),
                right: Box::new(right),
            }
        } else {
            Self::make_leaf(infos, primitives, ordered, bounds)
        }
    }

    fn make_leaf(
        infos: &[PrimitiveInfo],
        primitives: &[Primitive],
        ordered: &mut Vec<Primitive>,
        bounds: Bounds3,
    ) -> BuildNode {
        let first_prim = ordered.len() as u32;
        for info in infos {
            ordered.push(primitives[info.index].clone());
        }
        BuildNode::Leaf {
            bounds,
            first_prim,
            n_prims: infos.len() as u16,
        }
    }

    fn flatten(node: &BuildNode, nodes: &mut Vec<LinearBvhNode>) -> usize {
        let my_index = nodes.len();
        match node {
            BuildNode::Leaf {
                bounds,
                first_prim,
                n_prims,
            } => {
                nodes.push(LinearBvhNode {
                    bounds: Bounds3f32::from(*bounds),
                    offset: *first_prim,
                    count_or_axis: *n_prims,
                    is_interior: 0,
                });
            }
            BuildNode::Interior {
                bounds,
                axis,
                left,
                right,
            } => {
                nodes.push(LinearBvhNode {
                    bounds: Bounds3f32::from(*bounds),
                    offset: 0,
                    count_or_axis: *axis as u16,
                    is_interior: 1,
                });
                Self::flatten(left, nodes);
                let second_child = Self::flatten(right, nodes);
                nodes[my_index].offset = second_child as u32;
            }
        }
        my_index
    }

    pub fn world_bounds(&self) -> Bounds3 {
        let b = &self.nodes[0].bounds;
        Bounds3::new(
            Point3f::new(b.p_min.x as Float, b.p_min.y as Float, b.p_min.z as Float),
            Point3f::new(b.p_max.x as Float, b.p_max.y as Float, b.p_max.z as Float),
        )
    }

    /// Ordered traversal (near child first, by direction sign on the
    /// split axis), returning the closest hit.
    pub fn intersect(&self, ray: &Ray) -> Option<(Float, SurfacePoint, usize)> {
        if self.ordered.is_empty() {
            return None;
        }
        let inv_dir = Vector3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg = [inv_dir.x < 0.0, inv_dir.y < 0.0, inv_dir.z < 0.0];

        let mut working_ray = *ray;
        let mut best: Option<(Float, SurfacePoint, usize)> = None;
        let mut stack = [0u32; MAX_STACK_DEPTH];
        let mut stack_ptr = 0usize;
        let mut current = 0usize;
        loop {
            let node = &self.nodes[current];
            if node.bounds.intersect_p(&working_ray, &inv_dir, dir_is_neg) {
                if node.is_interior == 0 {
                    let first = node.offset as usize;
                    let count = node.count_or_axis as usize;
                    for i in first..first + count {
                        if let Some((t, sp)) = self.ordered[i].intersect(&working_ray) {
                            if t < working_ray.t_max {
                                working_ray.t_max = t;
                                best = Some((t, sp, i));
                            }
                        }
                    }
                    if stack_ptr == 0 {
                        break;
                    }
                    stack_ptr -= 1;
                    current = stack[stack_ptr] as usize;
                } else {
                    let axis = node.count_or_axis as usize;
                    let (first_child, second_child) = (current + 1, node.offset as usize);
                    if dir_is_neg[axis] {
                        stack[stack_ptr] = first_child as u32;
                        stack_ptr += 1;
                        current = second_child;
                    } else {
                        stack[stack_ptr] = second_child as u32;
                        stack_ptr += 1;
                        current = first_child;
                    }
                }
            } else {
                if stack_ptr == 0 {
                    break;
                }
                stack_ptr -= 1;
                current = stack[stack_ptr] as usize;
            }
        }
        best
    }

    /// Any-hit traversal for shadow rays: stops at the first hit with
    /// `t < ray.t_max`, no ordering needed.
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        if self.ordered.is_empty() {
            return false;
        }
        let inv_dir = Vector3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg = [inv_dir.x < 0.0, inv_dir.y < 0.0, inv_dir.z < 0.0];

        let mut stack = [0u32; MAX_STACK_DEPTH];
        let mut stack_ptr = 0usize;
        let mut current = 0usize;
        loop {
            let node = &self.nodes[current];
            if node.bounds.intersect_p(ray, &inv_dir, dir_is_neg) {
                if node.is_interior == 0 {
                    let first = node.offset as usize;
                    let count = node.count_or_axis as usize;
                    for i in first..first + count {
                        if let Some((t, _)) = self.ordered[i].intersect(ray) {
                            if t < ray.t_max {
                                return true;
                            }
                        }
                    }
                    if stack_ptr == 0 {
                        break;
                    }
                    stack_ptr -= 1;
                    current = stack[stack_ptr] as usize;
                } else {
                    stack[stack_ptr] = (current + 1) as u32;
                    stack_ptr += 1;
                    current = node.offset as usize;
                }
            } else {
                if stack_ptr == 0 {
                    break;
                }
                stack_ptr -= 1;
                current = stack[stack_ptr] as usize;
            }
        }
        false
    }

    pub fn max_depth(&self) -> usize {
        fn depth_of(nodes: &[LinearBvhNode], index: usize) -> usize {
            let node = &nodes[index];
            if node.is_interior == 0 {
                1
            } else {
                1 + depth_of(nodes, index + 1).max(depth_of(nodes, node.offset as usize))
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            depth_of(&self.nodes, 0)
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The owning entity index of the primitive at `prim_index` (the
    /// index returned by [`Bvh::intersect`]).
    pub fn entity_at(&self, prim_index: usize) -> usize {
        self.ordered[prim_index].entity
    }
}

fn centroid_component(p: &Point3f, axis: XYZEnum) -> Float {
    match axis {
        XYZEnum::X => p.x,
        XYZEnum::Y => p.y,
        XYZEnum::Z => p.z,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scene::Primitive;
    use crate::core::transform::Transform;
    use crate::shapes::sphere::Sphere;
    use crate::shapes::Shape;

    fn sphere_primitive(entity: usize, x: Float) -> Primitive {
        Primitive {
            entity,
            shape: Shape::Sphere(Sphere::new(0.5, Transform::translation(Vector3f::new(x, 0.0, 0.0)))),
        }
    }

    #[test]
    fn empty_bvh_misses_everything() {
        let bvh = Bvh::build(Vec::new());
        let ray = Ray::new(Point3f::new(0.0, 0.0, -5.0), Vector3f::new(0.0, 0.0, 1.0), Float::INFINITY);
        assert!(bvh.intersect(&ray).is_none());
        assert!(!bvh.intersect_p(&ray));
    }

    #[test]
    fn finds_closest_of_several_spheres() {
        let prims: Vec<Primitive> = (0..20).map(|i| sphere_primitive(i, i as Float * 3.0)).collect();
        let bvh = Bvh::build(prims);
        let ray = Ray::new(Point3f::new(9.0, 0.0, -10.0), Vector3f::new(0.0, 0.0, 1.0), Float::INFINITY);
        let (t, sp, _) = bvh.intersect(&ray).expect("should hit sphere at x=9");
        assert!((sp.p.x - 9.0).abs() < 1e-6);
        assert!(t > 0.0);
    }

    #[test]
    fn any_hit_stops_before_tmax_only() {
        let prims: Vec<Primitive> = (0..5).map(|i| sphere_primitive(i, i as Float * 3.0)).collect();
        let bvh = Bvh::build(prims);
        let mut ray = Ray::new(Point3f::new(0.0, 0.0, -10.0), Vector3f::new(0.0, 0.0, 1.0), 5.0);
        assert!(!bvh.intersect_p(&ray));
        ray.t_max = Float::INFINITY;
        assert!(bvh.intersect_p(&ray));
    }

    #[test]
    fn max_depth_stays_within_traversal_stack() {
        let prims: Vec<Primitive> = (0..200).map(|i| sphere_primitive(i, i as Float)).collect();
        let bvh = Bvh::build(prims);
        assert!(bvh.max_depth() <= MAX_STACK_DEPTH);
    }
}
