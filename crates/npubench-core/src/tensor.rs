use anyhow::{ensure, Result};
use bytes::Bytes;
use smallvec::SmallVec;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DType {
    F32,
    I64,
    I32,
    U16,
    U8,
}

impl DType {
    pub fn byte_size(self) -> usize {
        match self {
            DType::F32 => 4,
            DType::I64 => 8,
            DType::I32 => 4,
            DType::U16 => 2,
            DType::U8 => 1,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Shape(pub SmallVec<[usize; 6]>);

impl Shape {
    pub fn from_slice(d: &[usize]) -> Self {
        Self(d.iter().copied().collect())
    }
    pub fn rank(&self) -> usize {
        self.0.len()
    }
    pub fn numel(&self) -> usize {
        self.0.iter().product::<usize>()
    }
    pub fn dims(&self) -> &[usize] {
        &self.0
    }
}

#[derive(Clone, Debug)]
pub struct TensorDesc {
    pub dtype: DType,
    pub shape: Shape,
}

/// A dense, little-endian CPU tensor. Cloning shares the buffer.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub desc: TensorDesc,
    pub bytes: Bytes,
}

/// Plain element types a [`Tensor`] can hold.
pub trait Element: Copy + Send + Sync + 'static {
    const DTYPE: DType;

    fn put_le(self, out: &mut Vec<u8>);
    fn from_le(chunk: &[u8]) -> Self;
    fn to_f32(self) -> f32;
}

macro_rules! impl_element {
    ($ty:ty, $dtype:expr) => {
        impl Element for $ty {
            const DTYPE: DType = $dtype;

            fn put_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            fn from_le(chunk: &[u8]) -> Self {
                let mut raw = [0u8; std::mem::size_of::<$ty>()];
                raw.copy_from_slice(chunk);
                <$ty>::from_le_bytes(raw)
            }

            fn to_f32(self) -> f32 {
                self as f32
            }
        }
    };
}

impl_element!(f32, DType::F32);
impl_element!(i64, DType::I64);
impl_element!(i32, DType::I32);
impl_element!(u16, DType::U16);
impl_element!(u8, DType::U8);

impl Tensor {
    pub fn from_cpu_bytes(dtype: DType, shape: Shape, bytes: Bytes) -> Self {
        Self {
            desc: TensorDesc { dtype, shape },
            bytes,
        }
    }

    pub fn from_values<T: Element>(shape: Shape, values: &[T]) -> Result<Self> {
        ensure!(
            values.len() == shape.numel(),
            "shape {:?} needs {} elements, got {}",
            shape.dims(),
            shape.numel(),
            values.len()
        );

        let mut buf = Vec::with_capacity(std::mem::size_of_val(values));
        for v in values {
            v.put_le(&mut buf);
        }
        Ok(Self::from_cpu_bytes(T::DTYPE, shape, Bytes::from(buf)))
    }

    pub fn dtype(&self) -> DType {
        self.desc.dtype
    }

    pub fn shape(&self) -> &Shape {
        &self.desc.shape
    }

    /// Decodes the buffer as `T`; the tensor must actually hold `T`.
    pub fn values<T: Element>(&self) -> Result<Vec<T>> {
        ensure!(
            self.desc.dtype == T::DTYPE,
            "tensor holds {:?}, requested {:?}",
            self.desc.dtype,
            T::DTYPE
        );
        let width = T::DTYPE.byte_size();
        ensure!(
            self.bytes.len() == self.desc.shape.numel() * width,
            "tensor byte length {} does not match shape {:?}",
            self.bytes.len(),
            self.desc.shape.dims()
        );
        Ok(self.bytes.chunks_exact(width).map(T::from_le).collect())
    }

    /// Decodes any supported element type, widening or narrowing to `f32`.
    pub fn to_f32_vec(&self) -> Result<Vec<f32>> {
        fn widen<T: Element>(t: &Tensor) -> Result<Vec<f32>> {
            Ok(t.values::<T>()?.into_iter().map(Element::to_f32).collect())
        }

        match self.desc.dtype {
            DType::F32 => self.values::<f32>(),
            DType::I64 => widen::<i64>(self),
            DType::I32 => widen::<i32>(self),
            DType::U16 => widen::<u16>(self),
            DType::U8 => widen::<u8>(self),
        }
    }
}
