use std::rc::Rc;

use gl_wrapper::backend::GlBackend;
use gl_wrapper::geometry::{GBError, Geometry, GeometryBuilder, VertexAttribute};

pub const CLEAR_COLOR: [f32; 4] = [0.2, 0.5, 0.1, 1.0];

#[rustfmt::skip]
pub const TRIANGLE: [f32; 9] = [
    -0.5, -0.5, 0.0,
    0.5, -0.5, 0.0,
    0.0, 0.5, 0.0,
];

// top right, bottom right, bottom left, top left
#[rustfmt::skip]
pub const RECT_LEFT: [f32; 12] = [
    -0.1, 0.5, 0.0,
    -0.1, -0.5, 0.0,
    -0.9, -0.5, 0.0,
    -0.9, 0.5, 0.0,
];

#[rustfmt::skip]
pub const RECT_RIGHT: [f32; 12] = [
    0.9, 0.5, 0.0,
    0.9, -0.5, 0.0,
    0.1, -0.5, 0.0,
    0.1, 0.5, 0.0,
];

pub const RECT_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

/// Static position data for one geometry object, `xyz` per vertex.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Shape {
    pub vertices: &'static [f32],
    pub indices: Option<&'static [u32]>,
}

impl Shape {
    pub fn build(&self, gl: &Rc<dyn GlBackend>) -> Result<Geometry, GBError> {
        let mut builder =
            GeometryBuilder::new(self.vertices).with_attribute(VertexAttribute::Vec3);

        if let Some(indices) = self.indices {
            builder = builder.with_indices(indices);
        }

        builder.build(gl)
    }
}

/// Which set of primitives the viewer draws.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scene {
    Triangle,
    Rectangles,
}

impl Scene {
    /// Shapes in the order they are drawn every frame.
    pub fn shapes(&self) -> Vec<Shape> {
        match self {
            Scene::Triangle => vec![Shape {
                vertices: &TRIANGLE,
                indices: None,
            }],
            Scene::Rectangles => vec![
                Shape {
                    vertices: &RECT_LEFT,
                    indices: Some(&RECT_INDICES),
                },
                Shape {
                    vertices: &RECT_RIGHT,
                    indices: Some(&RECT_INDICES),
                },
            ],
        }
    }

    pub fn build(&self, gl: &Rc<dyn GlBackend>) -> Result<Vec<Geometry>, GBError> {
        self.shapes().iter().map(|s| s.build(gl)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gl_wrapper::recording::RecordingGl;

    /// Triangles as vertex triples, in draw order.
    fn triangles(shape: &Shape) -> Vec<[[f32; 3]; 3]> {
        let vertex = |i: usize| {
            let v = &shape.vertices[i * 3..i * 3 + 3];
            [v[0], v[1], v[2]]
        };

        let order: Vec<usize> = match shape.indices {
            Some(indices) => indices.iter().map(|i| *i as usize).collect(),
            None => (0..shape.vertices.len() / 3).collect(),
        };

        order
            .chunks_exact(3)
            .map(|t| [vertex(t[0]), vertex(t[1]), vertex(t[2])])
            .collect()
    }

    fn area(t: &[[f32; 3]; 3]) -> f32 {
        let [a, b, c] = t;
        ((b[0] - a[0]) * (c[1] - a[1]) - (c[0] - a[0]) * (b[1] - a[1])).abs() / 2.0
    }

    fn bounds(vertices: &[f32]) -> (f32, f32, f32, f32) {
        let xs = vertices.iter().step_by(3);
        let ys = vertices.iter().skip(1).step_by(3);

        (
            xs.clone().cloned().fold(f32::MAX, f32::min),
            xs.cloned().fold(f32::MIN, f32::max),
            ys.clone().cloned().fold(f32::MAX, f32::min),
            ys.cloned().fold(f32::MIN, f32::max),
        )
    }

    #[test]
    fn triangle_scene_is_one_array_draw() {
        let shapes = Scene::Triangle.shapes();

        assert_eq!(shapes.len(), 1);
        assert_eq!(shapes[0].indices, None);
        assert_eq!(
            triangles(&shapes[0]),
            vec![[[-0.5, -0.5, 0.0], [0.5, -0.5, 0.0], [0.0, 0.5, 0.0]]]
        );
    }

    #[test]
    fn rectangles_are_covered_by_two_triangles() {
        for shape in Scene::Rectangles.shapes() {
            let triangles = triangles(&shape);
            assert_eq!(triangles.len(), 2);

            let (x0, x1, y0, y1) = bounds(shape.vertices);
            let rect_area = (x1 - x0) * (y1 - y0);

            // equal halves adding up to the rectangle leave no gap and no overlap
            for t in &triangles {
                assert!((area(t) - rect_area / 2.0).abs() < 1e-6);
            }
            assert_ne!(triangles[0], triangles[1]);
        }
    }

    #[test]
    fn rectangles_are_disjoint_left_then_right() {
        let shapes = Scene::Rectangles.shapes();
        let (_, left_max, _, _) = bounds(shapes[0].vertices);
        let (right_min, _, _, _) = bounds(shapes[1].vertices);

        assert!(left_max < right_min);
    }

    #[test]
    fn builds_one_geometry_per_shape() {
        let rec = Rc::new(RecordingGl::new());
        let gl: Rc<dyn GlBackend> = rec.clone();

        let geometries = Scene::Rectangles.build(&gl).unwrap();

        assert_eq!(geometries.len(), 2);
        assert!(geometries.iter().all(|g| g.draw_count() == 6));
        assert_eq!(rec.array_data(geometries[0].vao()).unwrap(), RECT_LEFT.to_vec());
        assert_eq!(rec.array_data(geometries[1].vao()).unwrap(), RECT_RIGHT.to_vec());
    }
}
