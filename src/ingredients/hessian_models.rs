use crate::algebra::{FloatT, SymmetricMatrix};
use crate::model::Model;
use crate::optimization::OptimizationError;
use crate::reformulation::OptimizationProblem;
use enum_dispatch::enum_dispatch;
use std::marker::PhantomData;

/// Local curvature model handed to the subproblem methods.
#[enum_dispatch]
pub trait HessianEvaluator<T: FloatT> {
    /// Write the symmetric Lagrangian Hessian (upper triangle) into `hessian`.
    fn evaluate(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        primals: &[T],
        constraint_multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    );

    /// A positive definite model needs no primal regularization.
    fn is_positive_definite(&self) -> bool;

    /// Structural size, used to preallocate matrices.
    fn number_nonzeros(&self, model: &dyn Model<T>) -> usize;

    fn evaluation_count(&self) -> usize;
}

/// The exact Lagrangian Hessian of the model.
pub struct ExactHessian<T> {
    evaluation_count: usize,
    _float: PhantomData<T>,
}

impl<T> Default for ExactHessian<T> {
    fn default() -> Self {
        Self {
            evaluation_count: 0,
            _float: PhantomData,
        }
    }
}

impl<T: FloatT> HessianEvaluator<T> for ExactHessian<T> {
    fn evaluate(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        primals: &[T],
        constraint_multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    ) {
        hessian.reset();
        problem.evaluate_model_lagrangian_hessian(primals, constraint_multipliers, hessian);
        self.evaluation_count += 1;
    }

    fn is_positive_definite(&self) -> bool {
        false
    }

    fn number_nonzeros(&self, model: &dyn Model<T>) -> usize {
        model.number_hessian_nonzeros()
    }

    fn evaluation_count(&self) -> usize {
        self.evaluation_count
    }
}

/// A vanishing Hessian: reduces QP subproblems to LPs.
#[derive(Default)]
pub struct ZeroHessian;

impl<T: FloatT> HessianEvaluator<T> for ZeroHessian {
    fn evaluate(
        &mut self,
        _problem: &dyn OptimizationProblem<T>,
        _primals: &[T],
        _constraint_multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    ) {
        hessian.reset();
    }

    fn is_positive_definite(&self) -> bool {
        false
    }

    fn number_nonzeros(&self, _model: &dyn Model<T>) -> usize {
        0
    }

    fn evaluation_count(&self) -> usize {
        0
    }
}

/// Identity curvature: the simplest positive definite quasi-Newton stand-in.
#[derive(Default)]
pub struct IdentityHessian;

impl<T: FloatT> HessianEvaluator<T> for IdentityHessian {
    fn evaluate(
        &mut self,
        problem: &dyn OptimizationProblem<T>,
        _primals: &[T],
        _constraint_multipliers: &[T],
        hessian: &mut SymmetricMatrix<T>,
    ) {
        hessian.reset();
        for i in 0..problem.number_variables() {
            hessian.insert(i, i, T::one());
        }
    }

    fn is_positive_definite(&self) -> bool {
        true
    }

    fn number_nonzeros(&self, model: &dyn Model<T>) -> usize {
        model.number_variables()
    }

    fn evaluation_count(&self) -> usize {
        0
    }
}

#[enum_dispatch(HessianEvaluator<T>)]
pub enum HessianModel<T: FloatT> {
    Exact(ExactHessian<T>),
    Zero(ZeroHessian),
    Identity(IdentityHessian),
}

/// Instantiate a Hessian model from its option name.
pub fn create_hessian_model<T: FloatT>(name: &str) -> Result<HessianModel<T>, OptimizationError> {
    match name {
        "exact" => Ok(HessianModel::Exact(ExactHessian::default())),
        "zero" => Ok(HessianModel::Zero(ZeroHessian)),
        "identity" => Ok(HessianModel::Identity(IdentityHessian)),
        _ => Err(OptimizationError::InvalidConfiguration(format!(
            "unknown hessian model: {name}"
        ))),
    }
}
