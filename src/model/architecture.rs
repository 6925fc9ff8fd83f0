use candle_core::{DType, Device, Result, Tensor};
use candle_nn::{Dropout, Func, Linear, ModuleT, VarBuilder, VarMap};
use candle_transformers::models::resnet;

/// Width of the ResNet-18 feature vector after global pooling.
pub const BACKBONE_FEATURES: usize = 512;
pub const HIDDEN_UNITS: usize = 256;
pub const DROPOUT_RATE: f32 = 0.5;

/// ResNet-18 backbone with the classification layer replaced by a small head:
/// `fc.0` linear → ReLU → dropout → `fc.3` linear.
///
/// The head layout and its parameter names must match the network that
/// produced the checkpoint, otherwise loading fails.
pub struct SkinNet {
    backbone: Func<'static>,
    fc0: Linear,
    dropout: Dropout,
    fc3: Linear,
    num_classes: usize,
}

impl SkinNet {
    /// The backbone keeps the builder's lifetime, so only builders that own
    /// their storage (`from_tensors`, `from_varmap`, `zeros`) are accepted.
    pub fn new(vb: VarBuilder<'static>, num_classes: usize) -> Result<Self> {
        let backbone = resnet::resnet18_no_final_layer(vb.clone())?;
        let head = vb.pp("fc");
        let fc0 = candle_nn::linear(BACKBONE_FEATURES, HIDDEN_UNITS, head.pp("0"))?;
        let fc3 = candle_nn::linear(HIDDEN_UNITS, num_classes, head.pp("3"))?;
        Ok(Self {
            backbone,
            fc0,
            dropout: Dropout::new(DROPOUT_RATE),
            fc3,
            num_classes,
        })
    }

    /// Builds an untrained network. The returned [`VarMap`] owns its freshly
    /// initialized parameters, named the way a checkpoint names them.
    pub fn init(num_classes: usize, device: &Device) -> Result<(Self, VarMap)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
        let net = Self::new(vb, num_classes)?;
        Ok((net, varmap))
    }

    pub fn num_classes(&self) -> usize {
        self.num_classes
    }
}

impl ModuleT for SkinNet {
    fn forward_t(&self, xs: &Tensor, train: bool) -> Result<Tensor> {
        xs.apply(&self.backbone)?
            .apply(&self.fc0)?
            .relu()?
            .apply_t(&self.dropout, train)?
            .apply(&self.fc3)
    }
}

/// Every parameter [`SkinNet`] reads from a checkpoint, with its shape.
pub fn expected_parameters(num_classes: usize) -> Vec<(String, Vec<usize>)> {
    let mut params = Vec::new();
    conv(&mut params, "conv1", 64, 3, 7);
    batch_norm(&mut params, "bn1", 64);

    for (stage, c_in, c_out) in [(1, 64, 64), (2, 64, 128), (3, 128, 256), (4, 256, 512)] {
        for block in 0..2 {
            let prefix = format!("layer{stage}.{block}");
            let block_in = if block == 0 { c_in } else { c_out };
            conv(&mut params, &format!("{prefix}.conv1"), c_out, block_in, 3);
            batch_norm(&mut params, &format!("{prefix}.bn1"), c_out);
            conv(&mut params, &format!("{prefix}.conv2"), c_out, c_out, 3);
            batch_norm(&mut params, &format!("{prefix}.bn2"), c_out);
            if block == 0 && c_in != c_out {
                conv(&mut params, &format!("{prefix}.downsample.0"), c_out, c_in, 1);
                batch_norm(&mut params, &format!("{prefix}.downsample.1"), c_out);
            }
        }
    }

    params.push(("fc.0.weight".into(), vec![HIDDEN_UNITS, BACKBONE_FEATURES]));
    params.push(("fc.0.bias".into(), vec![HIDDEN_UNITS]));
    params.push(("fc.3.weight".into(), vec![num_classes, HIDDEN_UNITS]));
    params.push(("fc.3.bias".into(), vec![num_classes]));
    params
}

fn conv(params: &mut Vec<(String, Vec<usize>)>, name: &str, c_out: usize, c_in: usize, k: usize) {
    params.push((format!("{name}.weight"), vec![c_out, c_in, k, k]));
}

fn batch_norm(params: &mut Vec<(String, Vec<usize>)>, name: &str, channels: usize) {
    for field in ["weight", "bias", "running_mean", "running_var"] {
        params.push((format!("{name}.{field}"), vec![channels]));
    }
}
