fn main() {
    use build_script_cfg::Cfg;

    let gl = Cfg::new("use_gl");
    if cfg!(feature = "gl-interop") {
        gl.define();
    }
}
