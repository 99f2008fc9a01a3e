//! ### English
//! OpenGL implementation of [`GpuContext`] on top of `glow`.
//!
//! Context creation and currency belong to the windowing layer, so they are delegated to an
//! embedder-provided [`ContextBinding`]; this type only owns the GL function table.
//!
//! ### 中文
//! 基于 `glow` 的 [`GpuContext`] OpenGL 实现。
//!
//! 上下文的创建与 current 切换属于窗口层，因此委托给宿主提供的 [`ContextBinding`]；
//! 本类型只持有 GL 函数表。
use std::ffi::c_void;
use std::num::NonZeroU32;

use dpi::PhysicalSize;
use glow::HasContext as _;

use crate::engine::error::{Result, SurfaceError};
use crate::engine::frame::{FenceHandle, TextureHandle};

use super::GpuContext;

/// ### English
/// Embedder hook controlling the render thread's GL context (e.g. an offscreen window or
/// pbuffer created to share objects with the host context).
///
/// ### 中文
/// 宿主提供的钩子，控制渲染线程的 GL 上下文（例如与宿主上下文共享对象的离屏 window 或 pbuffer）。
pub trait ContextBinding {
    fn make_current(&self) -> bool;

    fn done_current(&self);

    /// ### English
    /// Whether this context was created in the host context's share group.
    ///
    /// ### 中文
    /// 该上下文是否创建在宿主上下文的共享组中。
    fn shares_with_host(&self) -> bool;
}

/// ### English
/// `glow`-backed render-thread context.
///
/// ### 中文
/// 基于 `glow` 的渲染线程上下文。
pub struct GlowContext {
    /// ### English
    /// glow GL API used for textures and fence/sync operations.
    ///
    /// ### 中文
    /// 用于纹理与 fence/sync 操作的 glow GL API。
    gl: glow::Context,
    /// ### English
    /// Windowing-layer hook that owns the native context.
    ///
    /// ### 中文
    /// 持有原生上下文的窗口层钩子。
    binding: Box<dyn ContextBinding>,
}

impl GlowContext {
    /// ### English
    /// Makes `binding` current and loads the GL entry points through `loader`.
    /// Must be called on the render thread.
    ///
    /// #### Parameters
    /// - `binding`: Native context hook (shared with the host context).
    /// - `loader`: Proc-address loader for the native context.
    ///
    /// ### 中文
    /// 使 `binding` current，并通过 `loader` 加载 GL 函数入口。必须在渲染线程调用。
    ///
    /// #### 参数
    /// - `binding`：原生上下文钩子（与宿主上下文共享）。
    /// - `loader`：原生上下文的函数地址加载器。
    pub fn new<F>(binding: Box<dyn ContextBinding>, loader: F) -> Result<Self>
    where
        F: FnMut(&str) -> *const c_void,
    {
        if !binding.make_current() {
            return Err(SurfaceError::ContextCreation(
                "failed to make the render context current".to_string(),
            ));
        }

        let gl = unsafe { glow::Context::from_loader_function(loader) };
        Ok(Self::from_parts(gl, binding))
    }

    /// ### English
    /// Wraps an already loaded `glow` context.
    ///
    /// ### 中文
    /// 包装一个已加载的 `glow` 上下文。
    pub fn from_parts(gl: glow::Context, binding: Box<dyn ContextBinding>) -> Self {
        Self { gl, binding }
    }

    /// ### English
    /// Raw `glow` API, for render controls that draw with GL directly.
    ///
    /// ### 中文
    /// 原始 `glow` API，供直接用 GL 绘制的 render control 使用。
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    #[inline]
    fn native_fence(fence: FenceHandle) -> glow::NativeFence {
        glow::NativeFence(fence.0 as usize as *mut _)
    }
}

impl GpuContext for GlowContext {
    fn make_current(&self) -> bool {
        self.binding.make_current()
    }

    fn done_current(&self) {
        self.binding.done_current();
    }

    fn shares_resources_with_host(&self) -> bool {
        self.binding.shares_with_host()
    }

    fn create_texture(&self, size: PhysicalSize<u32>) -> Result<TextureHandle> {
        let width = i32::try_from(size.width)
            .map_err(|_| SurfaceError::Gpu(format!("texture width {} too large", size.width)))?;
        let height = i32::try_from(size.height)
            .map_err(|_| SurfaceError::Gpu(format!("texture height {} too large", size.height)))?;

        unsafe {
            let texture = self.gl.create_texture().map_err(SurfaceError::Gpu)?;
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl
                .tex_storage_2d(glow::TEXTURE_2D, 1, glow::RGBA8, width, height);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                glow::LINEAR as i32,
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
            Ok(TextureHandle(texture.0.get()))
        }
    }

    fn delete_texture(&self, texture: TextureHandle) {
        let Some(id) = NonZeroU32::new(texture.0) else {
            return;
        };
        unsafe {
            self.gl.delete_texture(glow::NativeTexture(id));
        }
    }

    fn insert_fence(&self) -> Result<FenceHandle> {
        let sync = unsafe {
            self.gl
                .fence_sync(glow::SYNC_GPU_COMMANDS_COMPLETE, 0)
                .map_err(SurfaceError::Gpu)?
        };
        Ok(FenceHandle(sync.0 as usize as u64))
    }

    fn is_fence_signaled(&self, fence: FenceHandle) -> bool {
        if fence.is_null() {
            return true;
        }

        let status = unsafe { self.gl.client_wait_sync(Self::native_fence(fence), 0, 0) };
        status == glow::ALREADY_SIGNALED || status == glow::CONDITION_SATISFIED
    }

    fn delete_fence(&self, fence: FenceHandle) {
        if fence.is_null() {
            return;
        }
        unsafe {
            self.gl.delete_sync(Self::native_fence(fence));
        }
    }

    fn flush(&self) {
        unsafe {
            self.gl.flush();
        }
    }
}
