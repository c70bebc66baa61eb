//! Print the `GenezioManager` CustomResourceDefinition as YAML.
//!
//! ```bash
//! cargo run --bin crdgen | kubectl apply -f -
//! ```

use anyhow::Result;
use genezio_operator::crd::GenezioManager;
use kube::CustomResourceExt;

fn main() -> Result<()> {
    print!("{}", serde_yaml::to_string(&GenezioManager::crd())?);
    Ok(())
}
