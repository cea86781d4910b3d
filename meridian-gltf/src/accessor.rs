//! Typed, strided views over glTF buffer data.
//!
//! An accessor names a buffer view, a byte offset into it, an element type
//! (`VEC3`, `SCALAR`, ...) and a component type (`F32`, `U16`, ...). The view
//! in turn names a buffer, an offset and an optional byte stride. This module
//! resolves that chain once and exposes per-element reads that never leave
//! the bytes the accessor is allowed to touch.

use gltf::accessor::{DataType, Dimensions};

/// Resolved, bounds-checked window over an accessor's elements.
#[derive(Clone, Copy, Debug)]
pub struct AccessorView<'a> {
    data: &'a [u8],
    stride: usize,
    count: usize,
    data_type: DataType,
    dimensions: Dimensions,
}

/// Size in bytes of one element of the given layout.
pub fn element_size(data_type: DataType, dimensions: Dimensions) -> usize {
    data_type.size() * dimensions.multiplicity()
}

impl<'a> AccessorView<'a> {
    /// Builds a view over `bytes`, starting at `offset`, with `count` elements
    /// spaced `stride` bytes apart. Returns `None` if the stride is smaller
    /// than one element or the last element would run past the slice.
    pub fn new(
        bytes: &'a [u8],
        offset: usize,
        stride: usize,
        count: usize,
        data_type: DataType,
        dimensions: Dimensions,
    ) -> Option<Self> {
        let size = element_size(data_type, dimensions);
        if stride < size {
            return None;
        }
        let span = match count {
            0 => 0,
            n => (n - 1).checked_mul(stride)?.checked_add(size)?,
        };
        let end = offset.checked_add(span)?;
        let data = bytes.get(offset..end)?;
        Some(Self {
            data,
            stride,
            count,
            data_type,
            dimensions,
        })
    }

    /// Resolves a glTF accessor against the loaded buffers.
    ///
    /// Sparse-only accessors (no buffer view) and accessors that do not fit
    /// inside their buffer view resolve to `None`.
    pub fn resolve(accessor: &gltf::Accessor<'_>, buffers: &'a [gltf::buffer::Data]) -> Option<Self> {
        let view = accessor.view()?;
        let buffer = buffers.get(view.buffer().index())?;
        let size = element_size(accessor.data_type(), accessor.dimensions());
        let stride = view.stride().unwrap_or(size);

        // Restrict reads to the buffer view, not the whole buffer.
        let view_end = view.offset().checked_add(view.length())?;
        let view_bytes = buffer.get(view.offset()..view_end)?;

        Self::new(
            view_bytes,
            accessor.offset(),
            stride,
            accessor.count(),
            accessor.data_type(),
            accessor.dimensions(),
        )
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// True if the view stores exactly this layout.
    pub fn is(&self, data_type: DataType, dimensions: Dimensions) -> bool {
        self.data_type == data_type && self.dimensions == dimensions
    }

    /// Human-readable layout, used in diagnostics.
    pub fn layout(&self) -> String {
        format!("{:?} {:?}", self.data_type, self.dimensions)
    }

    fn element(&self, index: usize) -> Option<&'a [u8]> {
        if index >= self.count {
            return None;
        }
        let start = index * self.stride;
        let size = element_size(self.data_type, self.dimensions);
        self.data.get(start..start + size)
    }

    /// Reads the first `N` float components of element `index`.
    /// The view must hold `F32` components.
    pub fn read_f32<const N: usize>(&self, index: usize) -> Option<[f32; N]> {
        if self.data_type != DataType::F32 {
            return None;
        }
        let bytes = self.element(index)?;
        let mut out = [0.0f32; N];
        let mut chunks = bytes.chunks_exact(4);
        for slot in out.iter_mut() {
            let chunk = chunks.next()?;
            *slot = f32::from_le_bytes(chunk.try_into().ok()?);
        }
        Some(out)
    }

    /// Reads the first `N` unsigned integer components of element `index`,
    /// widening `U8` to `u16`.
    pub fn read_u16<const N: usize>(&self, index: usize) -> Option<[u16; N]> {
        let bytes = self.element(index)?;
        let mut out = [0u16; N];
        match self.data_type {
            DataType::U8 => {
                for (slot, byte) in out.iter_mut().zip(bytes.iter()) {
                    *slot = u16::from(*byte);
                }
                if bytes.len() < N {
                    return None;
                }
            }
            DataType::U16 => {
                let mut chunks = bytes.chunks_exact(2);
                for slot in out.iter_mut() {
                    let chunk = chunks.next()?;
                    *slot = u16::from_le_bytes(chunk.try_into().ok()?);
                }
            }
            _ => return None,
        }
        Some(out)
    }

    /// Reads element `index` as a scalar unsigned index (`U8`, `U16` or `U32`).
    pub fn read_index(&self, index: usize) -> Option<u32> {
        let bytes = self.element(index)?;
        match self.data_type {
            DataType::U8 => bytes.first().map(|b| u32::from(*b)),
            DataType::U16 => Some(u32::from(u16::from_le_bytes(bytes.get(..2)?.try_into().ok()?))),
            DataType::U32 => Some(u32::from_le_bytes(bytes.get(..4)?.try_into().ok()?)),
            _ => None,
        }
    }

    /// Iterates over all elements as float arrays.
    pub fn iter_f32<const N: usize>(&self) -> impl Iterator<Item = [f32; N]> + 'a {
        let view = *self;
        (0..view.count).map_while(move |i| view.read_f32::<N>(i))
    }
}

/// Reads a `min`/`max` accessor bound as a 3-component vector.
pub fn bound_vec3(value: Option<gltf::json::Value>) -> Option<[f32; 3]> {
    let value = value?;
    let items = value.as_array()?;
    if items.len() < 3 {
        return None;
    }
    let mut out = [0.0f32; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        *slot = item.as_f64()? as f32;
    }
    Some(out)
}
