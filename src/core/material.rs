//! Scene-file material kinds, each responsible for building a [`Bsdf`]
//! at a shaded point from its parameters and any bound textures.

use crate::core::interaction::SurfacePoint;
use crate::core::microfacet::TrowbridgeReitzDistribution;
use crate::core::pbrt::Float;
use crate::core::reflection::{
    Bsdf, Bxdf, FresnelSpecular, LambertianReflection, MicrofacetReflection, SpecularReflection,
    SpecularTransmission,
};
use crate::core::spectrum::Spectrum;
use crate::core::texture::Texture;

#[derive(Clone)]
pub enum Material {
    Diffuse {
        reflectance: Texture,
    },
    Mirror {
        reflectance: Texture,
    },
    Glass {
        reflectance: Spectrum,
        transmittance: Spectrum,
        ior: Float,
    },
    Transparent {
        opacity: Float,
    },
    Metal {
        reflectance: Texture,
        roughness: Float,
    },
    Plastic {
        diffuse: Texture,
        specular: Texture,
        roughness: Float,
    },
}

impl Material {
    /// Builds the BSDF for this material at `p`, in `p`'s shading frame.
    pub fn evaluate_at_point(&self, p: &SurfacePoint) -> Bsdf {
        let mut bsdf = Bsdf::new(p.n, p.ns, p.ns_tangent);
        match self {
            Material::Diffuse { reflectance } => {
                bsdf.add(Bxdf::LambertianRefl(LambertianReflection {
                    r: reflectance.evaluate(p),
                }));
            }
            Material::Mirror { reflectance } => {
                bsdf.add(Bxdf::SpecRefl(SpecularReflection {
                    r: reflectance.evaluate(p),
                }));
            }
            Material::Glass {
                reflectance,
                transmittance,
                ior,
            } => {
                bsdf.add(Bxdf::FresnelSpec(FresnelSpecular {
                    r: *reflectance,
                    t: *transmittance,
                    eta_a: 1.0,
                    eta_b: *ior,
                }));
            }
            Material::Transparent { opacity } => {
                bsdf.add(Bxdf::SpecTrans(SpecularTransmission {
                    t: Spectrum::new(1.0 - opacity),
                    eta_a: 1.0,
                    eta_b: 1.0,
                }));
                if *opacity > 0.0 {
                    bsdf.add(Bxdf::SpecRefl(SpecularReflection {
                        r: Spectrum::new(*opacity),
                    }));
                }
            }
            Material::Metal {
                reflectance,
                roughness,
            } => {
                let alpha = TrowbridgeReitzDistribution::roughness_to_alpha(*roughness);
                bsdf.add(Bxdf::MicrofacetRefl(MicrofacetReflection {
                    r: reflectance.evaluate(p),
                    distribution: TrowbridgeReitzDistribution::new(alpha, alpha),
                    eta: 2.5,
                }));
            }
            Material::Plastic {
                diffuse,
                specular,
                roughness,
            } => {
                bsdf.add(Bxdf::LambertianRefl(LambertianReflection {
                    r: diffuse.evaluate(p),
                }));
                let alpha = TrowbridgeReitzDistribution::roughness_to_alpha(*roughness);
                bsdf.add(Bxdf::MicrofacetRefl(MicrofacetReflection {
                    r: specular.evaluate(p),
                    distribution: TrowbridgeReitzDistribution::new(alpha, alpha),
                    eta: 1.5,
                }));
            }
        }
        bsdf
    }
}
