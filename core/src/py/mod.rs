// Python-grensesnitt: tynne omslag rundt json_api. Feil mappes til ValueError.
use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::wrap_pyfunction;

use crate::error::PowerError;
use crate::json_api;

fn to_py(e: PowerError) -> PyErr {
    PyErr::new::<PyValueError, _>(e.to_string())
}

#[pyfunction]
fn evaluate_json(table_json: &str, model_json: &str) -> PyResult<String> {
    json_api::evaluate_json(table_json, model_json).map_err(to_py)
}

#[pyfunction]
fn fit_power_json(table_json: &str, model_json: &str, vary: &str) -> PyResult<String> {
    json_api::fit_power_json(table_json, model_json, vary).map_err(to_py)
}

#[pyfunction]
#[pyo3(signature = (table_json, config_json=None))]
fn process_activity_json(table_json: &str, config_json: Option<&str>) -> PyResult<String> {
    json_api::process_activity_json(table_json, config_json).map_err(to_py)
}

#[pyfunction]
fn metrics_text() -> PyResult<String> {
    crate::metrics::gather_text().map_err(|e| PyErr::new::<PyValueError, _>(e.to_string()))
}

#[pymodule]
fn ridepower_core(_py: Python, m: &PyModule) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(evaluate_json, m)?)?;
    m.add_function(wrap_pyfunction!(fit_power_json, m)?)?;
    m.add_function(wrap_pyfunction!(process_activity_json, m)?)?;
    m.add_function(wrap_pyfunction!(metrics_text, m)?)?;
    Ok(())
}
