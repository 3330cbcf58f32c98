use std::rc::Rc;

use log::debug;
use thiserror::Error;

use crate::backend::{BufferTarget, GlBackend};

pub struct GeometryBuilder<'a> {
    attributes: Vec<VertexAttribute>,
    data: &'a [f32],
    indices: Option<&'a [u32]>,
}

impl<'a> GeometryBuilder<'a> {
    pub fn new(data: &'a [f32]) -> Self {
        Self {
            data,
            attributes: Vec::new(),
            indices: None,
        }
    }

    pub fn with_attribute(mut self, attr: VertexAttribute) -> Self {
        self.attributes.push(attr);
        self
    }

    /// Makes the geometry indexed. Draws then go through the index buffer.
    pub fn with_indices(mut self, indices: &'a [u32]) -> Self {
        self.indices = Some(indices);
        self
    }

    pub fn build(self, gl: &Rc<dyn GlBackend>) -> Result<Geometry, GBError> {
        if self.attributes.is_empty() {
            return Err(GBError::NoAttributes);
        }

        if self.data.is_empty() {
            return Err(GBError::Empty);
        }

        let layout = VertexLayout::new(&self.attributes);

        if self.data.len() % layout.components() != 0 {
            return Err(GBError::InvalidDataLength);
        }

        let vertices = self.data.len() / layout.components();

        if let Some(indices) = self.indices {
            if indices.is_empty() {
                return Err(GBError::Empty);
            }

            if let Some(&index) = indices.iter().find(|i| **i as usize >= vertices) {
                return Err(GBError::IndexOutOfRange { index, vertices });
            }
        }

        let vao = gl.gen_vertex_array();
        let vbo = gl.gen_buffer();

        gl.bind_vertex_array(vao);
        gl.bind_buffer(BufferTarget::Array, vbo);
        gl.buffer_data(BufferTarget::Array, bytemuck::cast_slice(self.data));

        let ebo = self.indices.map(|indices| {
            let ebo = gl.gen_buffer();
            // element buffer binding is recorded in the vertex array
            gl.bind_buffer(BufferTarget::ElementArray, ebo);
            gl.buffer_data(BufferTarget::ElementArray, bytemuck::cast_slice(indices));
            ebo
        });

        for attr in layout.attributes() {
            gl.vertex_attrib_pointer(attr);
            gl.enable_vertex_attrib_array(attr.index);
        }

        gl.bind_buffer(BufferTarget::Array, 0);
        gl.bind_vertex_array(0);

        debug!(
            "Uploaded geometry {vao}: {vertices} vertices, {} indices",
            self.indices.map_or(0, |i| i.len())
        );

        Ok(Geometry {
            vao,
            vbo,
            ebo,
            vertices,
            indices: self.indices.map(|i| i.len()),
            layout,
            gl: Rc::clone(gl),
        })
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GBError {
    #[error("Geometry needs at least one vertex attribute")]
    NoAttributes,
    #[error("Geometry data is empty")]
    Empty,
    #[error("Invalid data length for given attributes")]
    InvalidDataLength,
    #[error("Index {index} out of range for {vertices} vertices")]
    IndexOutOfRange { index: u32, vertices: usize },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VertexAttribute {
    Float,
    Vec2,
    Vec3,
}

impl VertexAttribute {
    pub fn size(&self) -> usize {
        match self {
            VertexAttribute::Float => 1,
            VertexAttribute::Vec2 => 2,
            VertexAttribute::Vec3 => 3,
        }
    }
}

/// Where one attribute lives inside a vertex. `stride` and `offset` are in
/// bytes; a stride of 0 means tightly packed.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct AttributeDescriptor {
    pub index: u32,
    pub components: usize,
    pub normalized: bool,
    pub stride: usize,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexLayout {
    attributes: Vec<AttributeDescriptor>,
    components: usize,
}

impl VertexLayout {
    /// Interleaved `f32` layout, attributes numbered from 0 in order.
    pub fn new(attributes: &[VertexAttribute]) -> Self {
        let components: usize = attributes.iter().map(|a| a.size()).sum();
        let stride = if attributes.len() == 1 {
            0
        } else {
            components * std::mem::size_of::<f32>()
        };

        let mut offset = 0;
        let attributes = attributes
            .iter()
            .enumerate()
            .map(|(i, attr)| {
                let desc = AttributeDescriptor {
                    index: i as u32,
                    components: attr.size(),
                    normalized: false,
                    stride,
                    offset,
                };
                offset += attr.size() * std::mem::size_of::<f32>();
                desc
            })
            .collect();

        Self {
            attributes,
            components,
        }
    }

    pub fn attributes(&self) -> &[AttributeDescriptor] {
        &self.attributes
    }

    /// Floats per vertex.
    pub fn components(&self) -> usize {
        self.components
    }
}

pub struct Geometry {
    vao: u32,
    vbo: u32,
    ebo: Option<u32>,
    vertices: usize,
    indices: Option<usize>,
    layout: VertexLayout,
    gl: Rc<dyn GlBackend>,
}

impl Geometry {
    pub fn vao(&self) -> u32 {
        self.vao
    }

    pub fn vertices(&self) -> usize {
        self.vertices
    }

    pub fn indices(&self) -> Option<usize> {
        self.indices
    }

    /// Vertex invocations a single draw of this geometry produces.
    pub fn draw_count(&self) -> usize {
        self.indices.unwrap_or(self.vertices)
    }

    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }
}

impl Drop for Geometry {
    fn drop(&mut self) {
        if let Some(ebo) = self.ebo {
            self.gl.delete_buffer(ebo);
        }
        self.gl.delete_buffer(self.vbo);
        self.gl.delete_vertex_array(self.vao);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::RecordingGl;

    #[rustfmt::skip]
    const TRIANGLE: [f32; 9] = [
        -0.5, -0.5, 0.0,
        0.5, -0.5, 0.0,
        0.0, 0.5, 0.0,
    ];

    #[rustfmt::skip]
    const RECT: [f32; 12] = [
        0.5, 0.5, 0.0,
        0.5, -0.5, 0.0,
        -0.5, -0.5, 0.0,
        -0.5, 0.5, 0.0,
    ];

    const RECT_INDICES: [u32; 6] = [0, 1, 3, 1, 2, 3];

    fn backend() -> (Rc<RecordingGl>, Rc<dyn GlBackend>) {
        let rec = Rc::new(RecordingGl::new());
        let gl: Rc<dyn GlBackend> = rec.clone();
        (rec, gl)
    }

    #[test]
    fn single_attribute_is_tightly_packed() {
        let layout = VertexLayout::new(&[VertexAttribute::Vec3]);

        assert_eq!(
            layout.attributes(),
            &[AttributeDescriptor {
                index: 0,
                components: 3,
                normalized: false,
                stride: 0,
                offset: 0,
            }]
        );
    }

    #[test]
    fn interleaved_attributes_get_offsets() {
        let layout = VertexLayout::new(&[VertexAttribute::Vec3, VertexAttribute::Vec2]);

        assert_eq!(layout.components(), 5);
        assert_eq!(layout.attributes()[0].stride, 20);
        assert_eq!(layout.attributes()[1].offset, 12);
        assert_eq!(layout.attributes()[1].index, 1);
    }

    #[test]
    fn uploads_vertices() {
        let (rec, gl) = backend();

        let geometry = GeometryBuilder::new(&TRIANGLE)
            .with_attribute(VertexAttribute::Vec3)
            .build(&gl)
            .unwrap();

        assert_eq!(geometry.vertices(), 3);
        assert_eq!(geometry.indices(), None);
        assert_eq!(geometry.draw_count(), 3);
        assert_eq!(rec.array_data(geometry.vao()).unwrap(), TRIANGLE.to_vec());
        assert_eq!(rec.element_data(geometry.vao()), None);
    }

    #[test]
    fn uploads_indices_into_vertex_array() {
        let (rec, gl) = backend();

        let geometry = GeometryBuilder::new(&RECT)
            .with_attribute(VertexAttribute::Vec3)
            .with_indices(&RECT_INDICES)
            .build(&gl)
            .unwrap();

        assert_eq!(geometry.vertices(), 4);
        assert_eq!(geometry.draw_count(), 6);
        assert_eq!(
            rec.element_data(geometry.vao()).unwrap(),
            RECT_INDICES.to_vec()
        );
    }

    #[test]
    fn rejects_bad_lengths() {
        let (_, gl) = backend();

        let err = GeometryBuilder::new(&TRIANGLE[..8])
            .with_attribute(VertexAttribute::Vec3)
            .build(&gl)
            .err();
        assert_eq!(err, Some(GBError::InvalidDataLength));

        let err = GeometryBuilder::new(&[]).with_attribute(VertexAttribute::Vec3).build(&gl).err();
        assert_eq!(err, Some(GBError::Empty));

        let err = GeometryBuilder::new(&TRIANGLE).build(&gl).err();
        assert_eq!(err, Some(GBError::NoAttributes));
    }

    #[test]
    fn rejects_out_of_range_index() {
        let (rec, gl) = backend();

        let err = GeometryBuilder::new(&TRIANGLE)
            .with_attribute(VertexAttribute::Vec3)
            .with_indices(&[0, 1, 3])
            .build(&gl)
            .err();

        assert_eq!(
            err,
            Some(GBError::IndexOutOfRange {
                index: 3,
                vertices: 3
            })
        );
        assert!(rec.calls().is_empty());
    }

    #[test]
    fn drop_releases_buffers() {
        let (rec, gl) = backend();

        let geometry = GeometryBuilder::new(&RECT)
            .with_attribute(VertexAttribute::Vec3)
            .with_indices(&RECT_INDICES)
            .build(&gl)
            .unwrap();
        assert_eq!(rec.live_buffers(), 2);

        drop(geometry);
        assert_eq!(rec.live_buffers(), 0);
        assert_eq!(rec.live_vertex_arrays(), 0);
    }

    #[test]
    fn geometries_do_not_share_buffers() {
        let (rec, gl) = backend();

        let a = GeometryBuilder::new(&TRIANGLE)
            .with_attribute(VertexAttribute::Vec3)
            .build(&gl)
            .unwrap();
        let b = GeometryBuilder::new(&RECT)
            .with_attribute(VertexAttribute::Vec3)
            .with_indices(&RECT_INDICES)
            .build(&gl)
            .unwrap();

        assert_ne!(a.vao(), b.vao());
        assert_eq!(rec.array_data(a.vao()).unwrap(), TRIANGLE.to_vec());
        assert_eq!(rec.array_data(b.vao()).unwrap(), RECT.to_vec());
        assert_eq!(rec.element_data(a.vao()), None);
    }
}
