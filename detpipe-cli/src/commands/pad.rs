//! The `pad` command: padding and clipping of a single detection.

use anyhow::bail;
use detpipe_core::constants::{DETECTION_PADDING_X, DETECTION_PADDING_Y, HORIZONTAL_FLIP, ROTATION};
use detpipe_core::model::Detection;
use detpipe_core::{PaddingSpec, is_ill_formed, pad};
use log::warn;
use std::collections::BTreeMap;

use crate::cli::PadArgs;
use crate::error::CliResult;
use crate::output::write_json;

pub fn run_pad(args: &PadArgs) -> CliResult<()> {
    let &[x, y, width, height] = args.bounding_box.as_slice() else {
        bail!("--box takes four values (X,Y,WIDTH,HEIGHT), got {}", args.bounding_box.len());
    };
    let (frame_width, frame_height) = args.frame;

    let mut properties = BTreeMap::new();
    if args.rotation != 0.0 {
        properties.insert(ROTATION.to_string(), args.rotation.to_string());
    }
    if args.flip {
        properties.insert(HORIZONTAL_FLIP.to_string(), "TRUE".to_string());
    }
    let detection = Detection::new(x, y, width, height, -1.0, 0, 0, properties);
    if is_ill_formed(&detection, frame_width, frame_height) {
        warn!("Detection {x},{y} {width}x{height} does not overlap the {frame_width}x{frame_height} frame");
    }

    let x_padding = PaddingSpec::for_property(DETECTION_PADDING_X, &args.padding_x)?;
    let y_padding = PaddingSpec::for_property(DETECTION_PADDING_Y, &args.padding_y)?;
    let padded = pad(&x_padding, &y_padding, frame_width, frame_height, &detection);
    if padded.is_shrunk_to_nothing() {
        warn!("Padding shrank the detection to nothing; a 1-pixel region is used instead");
    }

    write_json(&padded, None)
}
