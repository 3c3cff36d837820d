use std::collections::{BTreeMap, HashMap};

use numpy::{PyArray1, ToPyArray};
use pyo3::exceptions::{PyRuntimeError, PyTypeError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyAny;

use crate::config::RawConfig;
use crate::detector::AnomalyDetector;
use crate::error::ScoringError;

impl From<ScoringError> for PyErr {
    fn from(err: ScoringError) -> PyErr {
        match err {
            ScoringError::Configuration { .. } | ScoringError::InvalidInput(_) => {
                PyValueError::new_err(err.to_string())
            }
            ScoringError::InsufficientData { .. } => PyRuntimeError::new_err(err.to_string()),
        }
    }
}

// Helper function to get an owned f64 series from PyAny (handles casting)
fn get_series_f64(x: &PyAny) -> PyResult<Vec<f64>> {
    let array: &PyArray1<f64> = if let Ok(arr) = x.extract::<&PyArray1<f64>>() {
        arr
    } else if let Ok(arr) = x.extract::<&PyArray1<f32>>() {
        arr.cast::<f64>(false)?
    } else if let Ok(arr) = x.extract::<&PyArray1<i64>>() {
        arr.cast::<f64>(false)?
    } else if let Ok(arr) = x.extract::<&PyArray1<i32>>() {
        arr.cast::<f64>(false)?
    } else if let Ok(arr) = x.extract::<&PyArray1<i16>>() {
        arr.cast::<f64>(false)?
    } else if let Ok(arr) = x.extract::<&PyArray1<u8>>() {
        arr.cast::<f64>(false)?
    } else if let Ok(values) = x.extract::<Vec<f64>>() {
        return Ok(values);
    } else {
        return Err(PyTypeError::new_err(
            "Unsupported input for 'series': expected a 1-D numeric numpy array or a list of floats",
        ));
    };
    Ok(array.readonly().as_array().to_vec())
}

/// Python-exposed wrapper around the Rust AnomalyDetector
#[pyclass(name = "AnomalyDetector")]
pub struct PyAnomalyDetector {
    inner: AnomalyDetector,
}

#[pymethods]
impl PyAnomalyDetector {
    #[new]
    fn new(config: HashMap<String, HashMap<String, String>>) -> PyResult<Self> {
        let raw: RawConfig = config
            .into_iter()
            .map(|(section, options)| (section, options.into_iter().collect::<BTreeMap<_, _>>()))
            .collect();
        Ok(PyAnomalyDetector {
            inner: AnomalyDetector::from_sections(&raw)?,
        })
    }

    fn context_count(&self, n: usize) -> usize {
        self.inner.context_count(n)
    }

    #[pyo3(signature = (series, progress=None))]
    fn evaluate(
        &self,
        py: Python<'_>,
        series: &PyAny,
        progress: Option<PyObject>,
    ) -> PyResult<Py<PyArray1<f64>>> {
        let values = get_series_f64(series)?;

        let mut callback_error: Option<PyErr> = None;
        let scores = match progress {
            Some(callback) => {
                let mut report = |fraction: f64| {
                    if callback_error.is_none() {
                        if let Err(err) = callback.call1(py, (fraction,)) {
                            callback_error = Some(err);
                        }
                    }
                };
                self.inner.evaluate(&values, Some(&mut report))?
            }
            None => self.inner.evaluate(&values, None)?,
        };
        if let Some(err) = callback_error {
            return Err(err);
        }

        Ok(scores.to_pyarray(py).into_py(py))
    }
}
