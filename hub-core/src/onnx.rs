use std::{
    fmt::Write,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use log::{debug, warn};
use ndarray::{ArrayD, IxDyn};
use tract_onnx::prelude::{
    DatumType, Framework, Graph, InferenceModelExt, IntoTensor, SimplePlan, Tensor, TypedFact,
    TypedOp, tvec,
};

use crate::model::{ModelInput, Predictor};

type RunnableModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// A concrete input fact that replaces whatever the file declares for input 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputPin {
    pub shape: Vec<usize>,
    /// Leave the declared element type alone when `None`.
    pub datum_type: Option<DatumType>,
}

impl InputPin {
    pub fn shape(shape: impl Into<Vec<usize>>) -> Self {
        Self {
            shape: shape.into(),
            datum_type: None,
        }
    }

    pub fn with_datum_type(mut self, datum_type: DatumType) -> Self {
        self.datum_type = Some(datum_type);
        self
    }
}

/// An ONNX graph executed with `tract`.
///
/// Used for the Keras-exported sequence models (DNN, RNN, LSTM) and the tumor CNN.
#[derive(Debug)]
pub struct OnnxModel {
    runnable: RunnableModel,
    input_type: DatumType,
    input_rank: usize,
    input_shape: Option<Vec<usize>>,
    path: PathBuf,
}

impl OnnxModel {
    /// Load and optimize an ONNX graph, falling back to the decluttered graph when
    /// optimization fails.
    pub fn load<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::load_with_input(model_path, None)
    }

    /// Load with input 0 fixed to `pin` before the graph is typed and optimized.
    pub fn load_pinned<P: AsRef<Path>>(model_path: P, pin: &InputPin) -> Result<Self> {
        Self::load_with_input(model_path, Some(pin))
    }

    fn load_with_input<P: AsRef<Path>>(model_path: P, pin: Option<&InputPin>) -> Result<Self> {
        let path = model_path.as_ref();
        anyhow::ensure!(path.exists(), "model file not found: {}", path.display());

        let runnable = match load_runnable_model(path, pin, true) {
            Ok(model) => {
                debug!("ONNX model {} optimized successfully", path.display());
                model
            }
            Err(opt_err) => {
                let mut chain_msg = String::new();
                for cause in opt_err.chain() {
                    let _ = writeln!(&mut chain_msg, "  - {cause}");
                }
                warn!(
                    "ONNX model {} failed optimized load; using decluttered graph.\nError chain:\n{}",
                    path.display(),
                    chain_msg.trim_end()
                );
                load_runnable_model(path, pin, false).with_context(|| {
                    format!("fallback to decluttered graph failed after optimize error: {opt_err}")
                })?
            }
        };

        let input_fact = runnable
            .model()
            .input_fact(0)
            .map_err(|e| anyhow::anyhow!("{} declares no input: {e}", path.display()))?;
        let input_type = input_fact.datum_type;
        let input_rank = input_fact.shape.rank();
        let input_shape = input_fact.shape.as_concrete().map(<[usize]>::to_vec);
        debug!(
            "ONNX model {} expects {:?} input of rank {} (shape {:?})",
            path.display(),
            input_type,
            input_rank,
            input_shape
        );

        Ok(Self {
            runnable,
            input_type,
            input_rank,
            input_shape,
            path: path.to_path_buf(),
        })
    }

    /// The input shape when every dimension is known at load time.
    pub fn input_shape(&self) -> Option<&[usize]> {
        self.input_shape.as_deref()
    }

    pub fn input_type(&self) -> DatumType {
        self.input_type
    }

    fn input_tensor(&self, input: &ModelInput) -> Result<Tensor> {
        let tensor = match input {
            ModelInput::Tokens(batch) => {
                let data: Vec<i64> = batch.iter().copied().collect();
                Tensor::from_shape(batch.shape(), &data)
            }
            ModelInput::Pixels(batch) => {
                let data: Vec<f32> = batch.iter().copied().collect();
                Tensor::from_shape(batch.shape(), &data)
            }
        }
        .map_err(|e| anyhow::anyhow!("failed to build input tensor: {e}"))?;

        if tensor.datum_type() == self.input_type {
            return Ok(tensor);
        }
        let cast = tensor.cast_to_dt(self.input_type).map_err(|e| {
            anyhow::anyhow!("cannot cast input to {:?}: {e}", self.input_type)
        })?;
        Ok(cast.into_owned())
    }
}

impl Predictor for OnnxModel {
    fn predict(&self, input: &ModelInput) -> Result<ArrayD<f32>> {
        anyhow::ensure!(
            input.shape().len() == self.input_rank,
            "{} expects rank-{} input, got shape {:?}",
            self.path.display(),
            self.input_rank,
            input.shape()
        );
        if let Some(expected) = self.input_shape.as_deref() {
            anyhow::ensure!(
                input.shape() == expected,
                "{} expects input of shape {:?}, got {:?}",
                self.path.display(),
                expected,
                input.shape()
            );
        }

        let tensor = self.input_tensor(input)?;
        let outputs = self
            .runnable
            .run(tvec![tensor.into()])
            .map_err(|e| anyhow::anyhow!("{} execution failed: {e}", self.path.display()))?;

        let first = outputs
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("{} produced no outputs", self.path.display()))?
            .into_tensor();
        let values = first
            .cast_to::<f32>()
            .map_err(|e| anyhow::anyhow!("model output is not numeric: {e}"))?;
        let data = values
            .as_slice::<f32>()
            .map_err(|e| anyhow::anyhow!("model output not contiguous: {e}"))?
            .to_vec();

        ArrayD::from_shape_vec(IxDyn(values.shape()), data)
            .context("model output shape does not match its data")
    }
}

fn load_runnable_model(
    path: &Path,
    pin: Option<&InputPin>,
    optimized: bool,
) -> Result<RunnableModel> {
    let mut model = tract_onnx::onnx()
        .model_for_path(path)
        .with_context(|| format!("failed to parse ONNX graph from {}", path.display()))?;

    if let Some(pin) = pin {
        let mut fact = model
            .input_fact(0)
            .map_err(|e| anyhow::anyhow!("{} declares no input: {e}", path.display()))?
            .clone()
            .with_shape(pin.shape.clone());
        if let Some(datum_type) = pin.datum_type {
            fact = fact.with_datum_type(datum_type);
        }
        model = model
            .with_input_fact(0, fact)
            .map_err(|e| anyhow::anyhow!("cannot pin input to {:?}: {e}", pin.shape))?;
    }

    if optimized {
        model
            .into_optimized()
            .map_err(|e| anyhow::anyhow!("unable to optimize graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make graph runnable: {e}"))
    } else {
        model
            .into_typed()
            .map_err(|e| anyhow::anyhow!("unable to type-check graph: {e}"))?
            .into_decluttered()
            .map_err(|e| anyhow::anyhow!("unable to declutter graph: {e}"))?
            .into_runnable()
            .map_err(|e| anyhow::anyhow!("unable to make graph runnable: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array4};
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// ReduceMean over a float `[N, 500]` input.
    fn mean_tokens_fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mean_tokens.onnx")
    }

    /// ReduceMean over a float `[N, 128, 128, 3]` input.
    fn mean_pixels_fixture() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/mean_pixels.onnx")
    }

    #[test]
    fn loading_missing_model_fails() {
        let err = OnnxModel::load("missing.onnx").expect_err("missing file");
        assert!(err.to_string().contains("model file not found"));
    }

    #[test]
    fn invalid_model_produces_useful_error() {
        let mut temp = NamedTempFile::new().expect("temp file");
        temp.write_all(b"not a real onnx file")
            .expect("write mock model");

        let err = OnnxModel::load(temp.path()).expect_err("invalid ONNX should fail");
        let message = format!("{err:#}");
        assert!(
            message.contains("failed to parse ONNX") || message.contains("unable to optimize"),
            "Unexpected error message: {message}"
        );
    }

    #[test]
    fn symbolic_batch_leaves_shape_open() {
        let model = OnnxModel::load(mean_tokens_fixture()).expect("load fixture");
        assert_eq!(model.input_type(), DatumType::F32);
        assert_eq!(model.input_shape(), None);

        // Token indices are cast to the declared float input; any batch size runs.
        let batch = Array2::from_elem((2, 500), 3i64);
        let output = model.predict(&ModelInput::Tokens(batch)).expect("predict");
        assert_eq!(output.len(), 1);
        assert!(output.iter().all(|v| (v - 3.0).abs() < 1e-4), "mean was {output:?}");
    }

    #[test]
    fn pinned_input_is_concrete_and_enforced() {
        let pin = InputPin::shape(vec![1, 500]);
        let model = OnnxModel::load_pinned(mean_tokens_fixture(), &pin).expect("load pinned");
        assert_eq!(model.input_shape(), Some(&[1, 500][..]));

        let ok = model
            .predict(&ModelInput::Tokens(Array2::from_elem((1, 500), 2i64)))
            .expect("predict");
        assert!(ok.iter().all(|v| (v - 2.0).abs() < 1e-4), "mean was {ok:?}");

        let err = model
            .predict(&ModelInput::Tokens(Array2::zeros((2, 500))))
            .expect_err("batch of two does not match the pinned shape");
        assert!(err.to_string().contains("expects input of shape [1, 500]"));
    }

    #[test]
    fn pin_can_force_the_element_type() {
        let pin = InputPin::shape(vec![1, 128, 128, 3]).with_datum_type(DatumType::F32);
        let model = OnnxModel::load_pinned(mean_pixels_fixture(), &pin).expect("load pinned");
        assert_eq!(model.input_type(), DatumType::F32);
        assert_eq!(model.input_shape(), Some(&[1, 128, 128, 3][..]));

        let err = model
            .predict(&ModelInput::Pixels(Array4::zeros((1, 64, 64, 3))))
            .expect_err("wrong resolution");
        assert!(err.to_string().contains("[1, 128, 128, 3]"));
    }
}
