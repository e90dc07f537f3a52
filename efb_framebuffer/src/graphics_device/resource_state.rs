/// GPU synchronization states a render surface can be in

/// Last-known synchronization state of an image resource
///
/// A surface must be in the state matching the operation about to use it.
/// Transitions are recorded through `CommandRecorder::transition`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceState {
    /// Creation state. Contents are undefined; never transitioned back to.
    Common,
    /// Bound as a color render target
    RenderTarget,
    /// Bound as the depth-stencil target with depth writes
    DepthWrite,
    /// Sampled by a pixel shader
    PixelShaderResource,
    /// Source of a multisample resolve
    ResolveSource,
    /// Destination of a multisample resolve
    ResolveDest,
    /// Source of a copy
    CopySource,
    /// Destination of a copy
    CopyDest,
}

impl ResourceState {
    /// Whether the GPU writes the resource in this state
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            ResourceState::RenderTarget
                | ResourceState::DepthWrite
                | ResourceState::ResolveDest
                | ResourceState::CopyDest
        )
    }
}
