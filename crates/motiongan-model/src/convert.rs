//! ndarray ⇄ candle tensor conversion.

use candle_core::{Device, Result, Tensor};
use ndarray::{Array1, Array2, Array4};

pub fn tensor4(array: &Array4<f32>, device: &Device) -> Result<Tensor> {
    let (a, b, c, d) = array.dim();
    Tensor::from_vec(array.iter().copied().collect::<Vec<f32>>(), (a, b, c, d), device)
}

pub fn tensor2(array: &Array2<f32>, device: &Device) -> Result<Tensor> {
    let (a, b) = array.dim();
    Tensor::from_vec(array.iter().copied().collect::<Vec<f32>>(), (a, b), device)
}

pub fn tensor1_u32(array: &Array1<u32>, device: &Device) -> Result<Tensor> {
    Tensor::from_vec(array.to_vec(), (array.len(),), device)
}

pub fn array4(tensor: &Tensor) -> Result<Array4<f32>> {
    let dims = tensor.dims4()?;
    let data = tensor.flatten_all()?.to_vec1::<f32>()?;
    Array4::from_shape_vec(dims, data)
        .map_err(|e| candle_core::Error::Msg(format!("tensor to array: {e}")))
}
