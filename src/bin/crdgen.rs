use kube::CustomResourceExt;

use appshare_operator::crd::AppShare;
use appshare_operator::rbac;

/// Print the AppShare CRD; pass `--rbac` to append the operator ClusterRole.
fn main() -> anyhow::Result<()> {
    let with_rbac = std::env::args().skip(1).any(|arg| arg == "--rbac");

    print!("{}", serde_yaml::to_string(&AppShare::crd())?);
    if with_rbac {
        println!("---");
        print!("{}", serde_yaml::to_string(&rbac::cluster_role())?);
    }
    Ok(())
}
