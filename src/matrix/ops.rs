use super::Matrix2;
use crate::prelude::*;
use std::ops::{Add, AddAssign, Mul, Sub};

pub trait Dot<I> {
    type Output;
    fn dot(self, rhs: I) -> Result<Self::Output>;
}

pub trait Transpose {
    fn transpose(&self) -> Self;
}

impl<T: Clone> Transpose for Matrix2<T> {
    fn transpose(&self) -> Self {
        Matrix2::from_fn(self.cols(), self.rows(), |r, c| self[(c, r)].clone())
    }
}

impl<'a, T> Dot<&Matrix2<T>> for &'a Matrix2<T>
where
    T: Mul<Output = T> + Default + AddAssign + Copy,
{
    type Output = Matrix2<T>;
    fn dot(self, rhs: &Matrix2<T>) -> Result<Self::Output> {
        let mut out = Matrix2::new(self.rows(), rhs.cols());
        self.dot_into(rhs, &mut out)?;
        Ok(out)
    }
}

impl<T> Matrix2<T>
where
    T: Mul<Output = T> + Default + AddAssign + Copy,
{
    /// Matrix product written into `out`, which must already be
    /// `self.rows() × rhs.cols()`. Used by the forward pass to refill a
    /// layer's buffers without reallocating.
    pub fn dot_into(&self, rhs: &Matrix2<T>, out: &mut Matrix2<T>) -> Result<()> {
        if self.cols() != rhs.rows() || out.dim() != (self.rows(), rhs.cols()) {
            return Err(Error::DimensionErr);
        }

        for r in 0..self.rows() {
            for c in 0..rhs.cols() {
                let mut sum = T::default();
                for k in 0..self.cols() {
                    sum += self[(r, k)] * rhs[(k, c)];
                }
                out[(r, c)] = sum;
            }
        }
        Ok(())
    }
}

impl<'a, T> Add for &'a Matrix2<T>
where
    T: Add<Output = T> + Copy,
{
    type Output = Result<Matrix2<T>>;
    fn add(self, rhs: Self) -> Self::Output {
        self.zip_map(rhs, |&a, &b| a + b)
    }
}

impl<'a, T> Sub for &'a Matrix2<T>
where
    T: Sub<Output = T> + Copy,
{
    type Output = Result<Matrix2<T>>;
    fn sub(self, rhs: Self) -> Self::Output {
        self.zip_map(rhs, |&a, &b| a - b)
    }
}

#[cfg(test)]
mod tests {
    use crate::matrix::{
        ops::{Dot, Transpose},
        Matrix2,
    };
    use crate::prelude::*;

    #[test]
    fn transpose_swaps_nodes_and_passes() {
        let batch = Matrix2::from_array([[1, 2, 3], [4, 5, 6]]).transpose();

        assert_eq!(batch.dim(), (3, 2));
        assert_eq!(batch.to_vec(), [[1, 4], [2, 5], [3, 6]]);
    }

    #[test]
    fn weights_times_biased_batch() {
        // two nodes fed by one input plus the bias row, two passes
        let weights = Matrix2::from_array([[2, 1], [-1, 3]]);
        let biased = Matrix2::from_array([[5, 7], [1, 1]]);

        let alpha = weights.dot(&biased).unwrap();
        assert_eq!(alpha.dim(), (2, 2));
        assert_eq!(alpha.to_vec(), [[11, 15], [-2, -4]]);
    }

    #[test]
    fn backward_product_shape() {
        // transpose(omega) × delta: (prev + 1) × passes
        let omega = Matrix2::from_array([[1.0, 2.0, 0.5]]);
        let delta = Matrix2::from_array([[0.1, -0.2]]);

        let trans_weight = omega.transpose().dot(&delta).unwrap();
        assert_eq!(trans_weight.dim(), (3, 2));
        assert_eq!(trans_weight[(1, 1)], -0.4);
    }

    #[test]
    fn dot_rejects_inner_mismatch() {
        let m1 = Matrix2::from_array([[1, 2, 3], [4, 5, 6]]);
        let m2 = Matrix2::from_array([[1, 2], [3, 4]]);

        assert_eq!(m1.dot(&m2), Err(Error::DimensionErr));
    }

    #[test]
    fn dot_into_overwrites_buffer() {
        let m1 = Matrix2::from_array([[1, 2], [3, 4]]);
        let m2 = Matrix2::from_array([[1], [1]]);
        let mut out = Matrix2::from_array([[100], [100]]);

        m1.dot_into(&m2, &mut out).unwrap();
        assert_eq!(out.clone().to_vec(), [[3], [7]]);

        let mut wrong = Matrix2::new(1, 1);
        assert_eq!(m1.dot_into(&m2, &mut wrong), Err(Error::DimensionErr));
    }

    #[test]
    fn elementwise_add_and_sub() {
        let weights = Matrix2::from_array([[1.0, 2.0], [3.0, 4.0]]);
        let step = Matrix2::from_array([[0.5, 2.0], [1.0, 5.0]]);

        assert_eq!((&weights - &step).unwrap().to_vec(), [[0.5, 0.0], [2.0, -1.0]]);
        assert_eq!((&weights + &step).unwrap().to_vec(), [[1.5, 4.0], [4.0, 9.0]]);
    }

    #[test]
    fn elementwise_ops_check_shape() {
        let m1 = Matrix2::from_array([[1, 2], [3, 4], [5, 6]]);
        let m2 = Matrix2::from_array([[1, 2, 3], [4, 5, 6]]);

        assert_eq!(&m1 + &m2, Err(Error::DimensionErr));
        assert_eq!(&m1 - &m1.transpose(), Err(Error::DimensionErr));
    }
}
