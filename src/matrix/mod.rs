use crate::prelude::*;
use std::ops::{Index, IndexMut};

pub mod ops;

/// Dense, row-major matrix. Columns are samples (passes), rows are nodes.
#[derive(Debug, PartialEq, Clone)]
pub struct Matrix2<T> {
    data: Vec<T>,
    dim: (usize, usize),
}

impl<T: Clone> Matrix2<T> {
    /// Clones column `col` into an `rows × 1` matrix.
    pub fn column(&self, col: usize) -> Matrix2<T> {
        Matrix2 {
            data: (0..self.rows())
                .map(|row| self[(row, col)].clone())
                .collect(),
            dim: (self.rows(), 1),
        }
    }

    /// Overwrites column `col` with the entries of a `rows × 1` matrix.
    pub fn set_column(&mut self, col: usize, column: &Matrix2<T>) -> Result<()> {
        if column.dim != (self.rows(), 1) || col >= self.cols() {
            return Err(Error::DimensionErr);
        }
        for row in 0..self.rows() {
            self[(row, col)] = column[(row, 0)].clone();
        }
        Ok(())
    }

    /// Iterates over the columns as `rows × 1` matrices.
    pub fn columns(&self) -> impl Iterator<Item = Matrix2<T>> + '_ {
        (0..self.cols()).map(|col| self.column(col))
    }

    /// Returns a copy with one extra row filled with `value`.
    pub fn with_row_appended(&self, value: T) -> Matrix2<T> {
        let mut data = Vec::with_capacity((self.rows() + 1) * self.cols());
        data.extend_from_slice(&self.data);
        data.extend(std::iter::repeat(value).take(self.cols()));
        Matrix2 {
            data,
            dim: (self.rows() + 1, self.cols()),
        }
    }

    /// Returns a copy with the last row dropped.
    pub fn without_last_row(&self) -> Result<Matrix2<T>> {
        if self.rows() == 0 {
            return Err(Error::DimensionErr);
        }
        let rows = self.rows() - 1;
        Ok(Matrix2 {
            data: self.data[..rows * self.cols()].to_vec(),
            dim: (rows, self.cols()),
        })
    }

    /// Copies `other` into this matrix without reallocating. Shapes must agree.
    pub fn assign(&mut self, other: &Matrix2<T>) -> Result<()> {
        if self.dim != other.dim {
            return Err(Error::DimensionErr);
        }
        self.data.clone_from_slice(&other.data);
        Ok(())
    }
}

impl<T: Default + Clone> Matrix2<T> {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: vec![T::default(); rows * cols],
            dim: (rows, cols),
        }
    }
}

impl<T> Matrix2<T> {
    pub fn from_array<const R: usize, const C: usize>(arr: [[T; C]; R]) -> Self {
        let mut data = Vec::with_capacity(R * C);

        for row in arr {
            for x in row {
                data.push(x);
            }
        }

        Self { data, dim: (R, C) }
    }

    /// Builds a matrix by calling `f(row, col)` for every entry.
    pub fn from_fn<F: FnMut(usize, usize) -> T>(rows: usize, cols: usize, mut f: F) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for row in 0..rows {
            for col in 0..cols {
                data.push(f(row, col));
            }
        }
        Self {
            data,
            dim: (rows, cols),
        }
    }

    /// Builds a `len × 1` column vector.
    pub fn from_column(col_vec: Vec<T>) -> Self {
        Self {
            dim: (col_vec.len(), 1),
            data: col_vec,
        }
    }

    pub fn from_row(row_vec: Vec<T>) -> Self {
        Self {
            dim: (1, row_vec.len()),
            data: row_vec,
        }
    }

    pub fn from_vec(vec: Vec<Vec<T>>) -> Result<Self> {
        let rows = vec.len();
        let cols = vec.first().map(|row| row.len()).unwrap_or(0);

        let mut data = Vec::with_capacity(rows * cols);
        for row in vec {
            if cols != row.len() {
                return Err(Error::DimensionErr);
            }
            data.extend(row);
        }

        Ok(Self {
            data,
            dim: (rows, cols),
        })
    }

    pub fn dim(&self) -> (usize, usize) {
        self.dim
    }

    pub fn rows(&self) -> usize {
        self.dim.0
    }

    pub fn cols(&self) -> usize {
        self.dim.1
    }

    pub fn to_vec(self) -> Vec<Vec<T>> {
        let cols = self.cols();
        let mut res = Vec::with_capacity(self.rows());
        let mut it = self.data.into_iter();
        for _ in 0..self.dim.0 {
            res.push(it.by_ref().take(cols).collect());
        }
        res
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.data.iter()
    }

    /// Maps every entry into a new matrix of the same shape.
    pub fn map<U, F: FnMut(&T) -> U>(&self, f: F) -> Matrix2<U> {
        Matrix2 {
            data: self.data.iter().map(f).collect(),
            dim: self.dim,
        }
    }

    /// Like [`Matrix2::map`] but stops at the first error.
    pub fn try_map<U, F: FnMut(&T) -> Result<U>>(&self, f: F) -> Result<Matrix2<U>> {
        Ok(Matrix2 {
            data: self.data.iter().map(f).collect::<Result<Vec<_>>>()?,
            dim: self.dim,
        })
    }

    /// Combines two equally shaped matrices entry by entry.
    pub fn zip_map<U, V, F>(&self, rhs: &Matrix2<U>, mut f: F) -> Result<Matrix2<V>>
    where
        F: FnMut(&T, &U) -> V,
    {
        if self.dim != rhs.dim {
            return Err(Error::DimensionErr);
        }
        Ok(Matrix2 {
            data: self
                .data
                .iter()
                .zip(rhs.data.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
            dim: self.dim,
        })
    }
}

impl<T> Matrix2<T>
where
    T: Default,
{
    /// Applies a function to every element of the matrix
    pub fn apply<F: Fn(T) -> T>(&mut self, f: F) {
        for x in &mut self.data {
            let old = std::mem::take(x);
            *x = f(old);
        }
    }
}

impl Matrix2<f64> {
    /// Multiplies every entry by `k`.
    pub fn scale(&self, k: f64) -> Matrix2<f64> {
        self.map(|x| x * k)
    }

    /// Elementwise (Hadamard) product.
    pub fn hadamard(&self, rhs: &Matrix2<f64>) -> Result<Matrix2<f64>> {
        self.zip_map(rhs, |a, b| a * b)
    }

    /// Sum of each column, as a `1 × cols` row.
    pub fn column_sums(&self) -> Matrix2<f64> {
        let mut sums = Matrix2::new(1, self.cols());
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                sums[(0, col)] += self[(row, col)];
            }
        }
        sums
    }

    /// Largest entry of each column, as a `1 × cols` row.
    pub fn column_max(&self) -> Matrix2<f64> {
        let mut max = Matrix2::from_row(vec![f64::NEG_INFINITY; self.cols()]);
        for row in 0..self.rows() {
            for col in 0..self.cols() {
                max[(0, col)] = max[(0, col)].max(self[(row, col)]);
            }
        }
        max
    }
}

impl<T> Index<(usize, usize)> for Matrix2<T> {
    type Output = T;
    fn index(&self, (i, j): (usize, usize)) -> &Self::Output {
        &self.data[i * self.cols() + j]
    }
}

impl<T> IndexMut<(usize, usize)> for Matrix2<T> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut Self::Output {
        let idx = i * self.cols() + j;
        &mut self.data[idx]
    }
}

impl From<Matrix2<i32>> for Matrix2<f64> {
    fn from(value: Matrix2<i32>) -> Self {
        Self {
            dim: value.dim(),
            data: value.data.into_iter().map(|x| x as f64).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn access_matrix2_from_array() {
        let matrix = Matrix2::from_array([[1, 2, 3], [4, 5, 6]]);
        assert_eq!(matrix[(0, 1)], 2);
        assert_eq!(matrix[(1, 2)], 6);
        assert_eq!(matrix[(0, 0)], 1);
        assert_eq!(matrix[(1, 1)], 5);
    }

    #[test]
    fn matrix2_from_vec_err() {
        let vec = vec![vec![1, 2, 3], vec![4, 5, 9], vec![1, 2]];
        assert_eq!(Matrix2::from_vec(vec), Err(Error::DimensionErr));

        let vec = vec![vec![1, 2], vec![4, 5, 9], vec![1, 2, 2]];
        assert_eq!(Matrix2::from_vec(vec), Err(Error::DimensionErr));
    }

    #[test]
    fn matrix2_from_fn() {
        let matrix = Matrix2::from_fn(2, 3, |r, c| r * 10 + c);
        assert_eq!(matrix.to_vec(), [[0, 1, 2], [10, 11, 12]]);
    }

    #[test]
    fn matrix2_apply() {
        let mut matrix = Matrix2::from_array([[1, 2], [2, 2], [4, 8]]);

        matrix.apply(|x| x / 2);

        assert_eq!(matrix.to_vec(), [[0, 1], [1, 1], [2, 4]]);
    }

    #[test]
    fn columns_round_trip_through_set_column() {
        let matrix = Matrix2::from_array([[1, 2], [3, 4], [5, 6]]);
        let mut swapped = Matrix2::new(3, 2);

        swapped.set_column(0, &matrix.column(1)).unwrap();
        swapped.set_column(1, &matrix.column(0)).unwrap();

        assert_eq!(swapped.to_vec(), [[2, 1], [4, 3], [6, 5]]);
        assert_eq!(matrix.columns().count(), 2);
    }

    #[test]
    fn set_column_rejects_wrong_length() {
        let mut matrix = Matrix2::<i32>::new(3, 2);
        let short = Matrix2::from_column(vec![1, 2]);
        assert_eq!(matrix.set_column(0, &short), Err(Error::DimensionErr));
        let right = Matrix2::from_column(vec![1, 2, 3]);
        assert_eq!(matrix.set_column(2, &right), Err(Error::DimensionErr));
    }

    #[test]
    fn bias_row_append_and_strip() {
        let matrix = Matrix2::from_array([[1.0, 2.0], [3.0, 4.0]]);
        let biased = matrix.with_row_appended(1.0);

        assert_eq!(biased.dim(), (3, 2));
        assert_eq!(biased.clone().to_vec()[2], [1.0, 1.0]);
        assert_eq!(biased.without_last_row().unwrap(), matrix);
        assert_eq!(
            Matrix2::<f64>::new(0, 2).without_last_row(),
            Err(Error::DimensionErr)
        );
    }

    #[test]
    fn column_reductions() {
        let matrix = Matrix2::from_array([[1.0, -2.0], [3.0, -4.0], [0.5, -1.0]]);

        assert_eq!(matrix.column_sums().to_vec(), [[4.5, -7.0]]);
        assert_eq!(matrix.column_max().to_vec(), [[3.0, -1.0]]);
    }

    #[test]
    fn zip_map_checks_shape() {
        let a = Matrix2::from_array([[1.0, 2.0]]);
        let b = Matrix2::from_array([[3.0, 4.0]]);
        let c = Matrix2::from_array([[3.0], [4.0]]);

        assert_eq!(a.hadamard(&b).unwrap().to_vec(), [[3.0, 8.0]]);
        assert_eq!(a.hadamard(&c), Err(Error::DimensionErr));
    }

    #[test]
    fn assign_keeps_shape() {
        let mut target = Matrix2::<f64>::new(1, 2);
        target.assign(&Matrix2::from_array([[5.0, 6.0]])).unwrap();
        assert_eq!(target.clone().to_vec(), [[5.0, 6.0]]);
        assert_eq!(
            target.assign(&Matrix2::new(2, 1)),
            Err(Error::DimensionErr)
        );
    }
}
