use devserver_types::*;
use kube::CustomResourceExt;
use std::fs;

fn main() {
    let _ = fs::create_dir("../crds");
    fs::write(
        "../crds/devserver.io_devserver_crd.yaml",
        serde_yaml::to_string(&DevServer::crd()).unwrap(),
    )
    .unwrap();
    fs::write(
        "../crds/devserver.io_devserverflavor_crd.yaml",
        serde_yaml::to_string(&DevServerFlavor::crd()).unwrap(),
    )
    .unwrap();
    fs::write(
        "../crds/devserver.io_devserveruser_crd.yaml",
        serde_yaml::to_string(&DevServerUser::crd()).unwrap(),
    )
    .unwrap();
}
